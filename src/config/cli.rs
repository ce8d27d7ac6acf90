use crate::core::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl Storage for LocalStorage {
    /// Written to a `.tmp` sibling, then renamed into place. The sibling is removed if the rename fails.
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = full_path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        fs::write(&tmp_name, data)?;
        if let Err(e) = fs::rename(&tmp_name, &full_path) {
            let _ = fs::remove_file(&tmp_name);
            return Err(e.into());
        }
        Ok(())
    }
}
