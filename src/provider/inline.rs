//! Provider whose ranges are known up front (configuration, tests).

use anyhow::Result;
use async_trait::async_trait;

use super::SourceProvider;

pub struct StaticProvider {
    name: String,
    ranges: Vec<String>,
}

impl StaticProvider {
    pub fn new<I, S>(name: impl Into<String>, ranges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            ranges: ranges.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl SourceProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_raw(&self) -> Result<Vec<String>> {
        Ok(self.ranges.clone())
    }
}
