//! This module defines test resources.
//!
//! They are used to test bundle loading without real resource types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{resource::LoaderMap, JsonLoader, Resource};

/// Plain data, shared with its bundle.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct TestText {
    pub(crate) content: String,
}

impl TestText {
    pub(crate) fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }
}

impl Resource for TestText {
    const TYPENAME: &'static str = "test_text";
}

/// Spawnable template, instantiated on every request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct TestPrefab {
    pub(crate) name: String,
    pub(crate) health: u32,
}

impl TestPrefab {
    pub(crate) fn new(name: &str, health: u32) -> Self {
        Self {
            name: name.to_string(),
            health,
        }
    }
}

impl Resource for TestPrefab {
    const TYPENAME: &'static str = "test_prefab";

    fn spawn(&self) -> Option<Self> {
        Some(self.clone())
    }
}

pub(crate) fn loaders() -> LoaderMap {
    let mut loaders = LoaderMap::new();
    loaders.insert(TestText::TYPE, Arc::new(JsonLoader::<TestText>::default()));
    loaders.insert(
        TestPrefab::TYPE,
        Arc::new(JsonLoader::<TestPrefab>::default()),
    );
    loaders
}
