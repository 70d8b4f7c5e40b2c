// Domain layer: deployment models and the ports external tools are plugged into.

pub mod model;
pub mod patterns;
pub mod ports;
