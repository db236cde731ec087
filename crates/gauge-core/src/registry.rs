// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Immutable tag registry.
//!
//! The registry maps symbolic tag names to validated [`Tag`]
//! declarations. It is built once from configuration and never mutated;
//! a configuration change is applied by building a fresh registry and
//! swapping the owning `Arc`, never by editing a live one mid-cycle.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::types::Tag;

/// Read-only map of tag declarations, shared by the poller and the
/// write gateway.
#[derive(Debug, Clone)]
pub struct TagRegistry {
    tags: HashMap<String, Arc<Tag>>,
    polled: Vec<Arc<Tag>>,
}

impl TagRegistry {
    /// Builds a registry from tag declarations.
    ///
    /// Validation enforced here, before any tag becomes visible:
    ///
    /// - names are unique;
    /// - bit-region tags (coils, discrete inputs) have length 1; a tag
    ///   is one point, and a bit point is one bit;
    /// - register tags have a length between 1 and the per-read
    ///   protocol limit of 125 words;
    /// - no address range runs past the end of the register space;
    /// - polled tags do not overlap within a region. Non-polled tags
    ///   may alias polled addresses (a write-only view of a polled
    ///   register is legitimate).
    pub fn new(tags: Vec<Tag>) -> Result<Self, RegistryError> {
        let mut by_name: HashMap<String, Arc<Tag>> = HashMap::with_capacity(tags.len());
        let mut polled: Vec<Arc<Tag>> = Vec::new();

        for tag in tags {
            let limit = if tag.region.is_bit() {
                1
            } else {
                tag.region.max_read_count()
            };
            if tag.length == 0 || tag.length > limit {
                return Err(RegistryError::InvalidLength {
                    tag: tag.name.clone(),
                    length: tag.length,
                    limit,
                });
            }
            if tag.end_address() > 65536 {
                return Err(RegistryError::AddressRange {
                    tag: tag.name.clone(),
                    address: tag.address,
                    length: tag.length,
                });
            }

            let tag = Arc::new(tag);
            if by_name.insert(tag.name.clone(), tag.clone()).is_some() {
                return Err(RegistryError::DuplicateName {
                    name: tag.name.clone(),
                });
            }
            if tag.polled {
                polled.push(tag);
            }
        }

        polled.sort_by_key(|t| (t.region, t.address));
        for pair in polled.windows(2) {
            if pair[0].overlaps(&pair[1]) {
                return Err(RegistryError::AddressOverlap {
                    first: pair[0].name.clone(),
                    second: pair[1].name.clone(),
                    region: pair[0].region.to_string(),
                });
            }
        }

        Ok(Self {
            tags: by_name,
            polled,
        })
    }

    /// Resolves a tag by name.
    pub fn resolve(&self, name: &str) -> Option<Arc<Tag>> {
        self.tags.get(name).cloned()
    }

    /// All polled tags, sorted by (region, address) so poll batches are
    /// deterministic.
    pub fn all_polled_tags(&self) -> &[Arc<Tag>] {
        &self.polled
    }

    /// Number of declared tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` if no tags are declared.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// All tag names, sorted.
    pub fn tag_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tags.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// =============================================================================
// Tests
// =============================================================================
