use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct InMemoryConfiguration {
    /// Pre-populate the store with a handful of sample posts and comments
    #[serde(default)]
    pub seed_demo_data: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum Configuration {
    InMemory(InMemoryConfiguration),
}
