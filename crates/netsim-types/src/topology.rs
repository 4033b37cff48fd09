use serde::{Deserialize, Serialize};

/// Which congestion-control policy a flow runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Reno,
    FastDelay,
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::Reno
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopologySpec {
    pub network: NetworkSpec,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkSpec {
    pub hosts: Vec<HostSpec>,
    #[serde(default)]
    pub routers: Vec<RouterSpec>,
    pub links: Vec<LinkSpec>,
    pub flows: Vec<FlowSpec>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostSpec {
    pub id: String,
    pub link: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouterSpec {
    pub id: String,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinkSpec {
    pub id: String,
    /// Buffer size, in KB.
    pub buffer_size: f64,
    /// Propagation delay, in ms.
    pub delay: f64,
    /// Link capacity, in Mbps.
    pub rate: f64,
    pub nodes: (String, String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlowSpec {
    pub id: String,
    pub src: String,
    pub dest: String,
    /// Total data volume, in MB.
    pub data_amt: f64,
    pub starting_time: f64,
    #[serde(default)]
    pub protocol: Protocol,
}
