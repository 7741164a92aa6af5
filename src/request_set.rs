use crate::FetchError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One distinct url and the index at which it first appeared in the caller's list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestSpec {
    pub url: String,
    pub position: usize,
}

/// Deduplicated urls, each tagged with its original position.
///
/// Positions are the raw index of first occurrence, so `[A, B, A, C]` yields
/// `A -> 0, B -> 1, C -> 3`. Position 2 is never used. Results are ordered
/// by position and compacted, so gaps never show up in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSet {
    specs: Vec<RequestSpec>,
    index: HashMap<String, usize>,
}

impl RequestSet {
    pub fn build<I, S>(urls: I) -> Result<Self, FetchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut specs = Vec::new();
        let mut index = HashMap::new();

        for (position, url) in urls.into_iter().enumerate() {
            let url = url.into();
            if index.contains_key(&url) {
                debug!(url = %url, position, "Skipping duplicate url");
                continue;
            }
            index.insert(url.clone(), specs.len());
            specs.push(RequestSpec { url, position });
        }

        if specs.is_empty() {
            return Err(FetchError::InvalidInput(
                "url list must contain at least one url".into(),
            ));
        }

        Ok(Self { specs, index })
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Specs in ascending position order.
    pub fn iter(&self) -> impl Iterator<Item = &RequestSpec> {
        self.specs.iter()
    }

    pub fn get(&self, url: &str) -> Option<&RequestSpec> {
        self.index.get(url).map(|&i| &self.specs[i])
    }

    pub fn position_of(&self, url: &str) -> Option<usize> {
        self.get(url).map(|spec| spec.position)
    }
}

impl<'a> IntoIterator for &'a RequestSet {
    type Item = &'a RequestSpec;
    type IntoIter = std::slice::Iter<'a, RequestSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}
