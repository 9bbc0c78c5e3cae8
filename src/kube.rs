mod cluster;
mod gateway;
mod pod;
mod store;

pub use cluster::{read_kubeconfig, KubeGateway};
pub use gateway::*;
