// Domain layer: records flowing through the pipeline and the ports the pipeline is built on.

pub mod model;
pub mod ports;
