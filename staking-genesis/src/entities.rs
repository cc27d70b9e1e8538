//! Entity name resolution
//!
//! Entity names are lower-cased everywhere. A resolver hands out the full
//! name → address table once, and single lookups afterwards.
//!
//! On disk an entity is a self-signed [`EntityDescriptor`]. Its address is
//! derived from the descriptor's `id`, which must be the key that signed it.

use crate::{
    address::Address,
    crypto::{KeyPair, PublicKey, SignedEnvelope, GENESIS_ENTITY_SIGNATURE_CONTEXT},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Location of the signed descriptor inside an entity directory
pub const ENTITY_DESCRIPTOR_PATH: &str = "entity/entity_genesis.json";

/// Registry descriptor of an entity, as carried in a signed envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Descriptor format version
    #[serde(default)]
    pub v: u16,
    /// Entity public key
    pub id: PublicKey,
    /// Nodes operated by the entity
    #[serde(default)]
    pub nodes: Vec<PublicKey>,
}

impl EntityDescriptor {
    /// Descriptor for `key_pair`'s public key, without nodes
    pub fn new(key_pair: &KeyPair) -> Self {
        Self {
            v: 2,
            id: key_pair.public_key(),
            nodes: Vec::new(),
        }
    }

    /// Self-sign under the genesis entity context
    pub fn sign(&self, key_pair: &KeyPair) -> Result<SignedEnvelope> {
        let payload = serde_json::to_vec(self)?;
        Ok(key_pair.sign_envelope(GENESIS_ENTITY_SIGNATURE_CONTEXT, &payload))
    }
}

/// Maps entity names to addresses
pub trait EntityResolver {
    /// Every known entity, keyed by lower-cased name
    fn all(&self) -> &BTreeMap<String, Address>;

    /// Address of `name`, ignoring case
    fn resolve(&self, name: &str) -> Result<Address> {
        let name = name.to_lowercase();
        self.all()
            .get(&name)
            .copied()
            .ok_or(Error::UnknownEntity(name))
    }
}

/// Entities held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticEntities {
    entities: BTreeMap<String, Address>,
}

impl StaticEntities {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity; a name already present (ignoring case) is an error
    pub fn insert(&mut self, name: &str, address: Address) -> Result<()> {
        let name = name.to_lowercase();
        if self.entities.contains_key(&name) {
            return Err(Error::DuplicateEntity(name));
        }
        self.entities.insert(name, address);
        Ok(())
    }

    /// Table built from named key pairs
    pub fn from_key_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a KeyPair)>,
    ) -> Result<Self> {
        let mut entities = Self::new();
        for (name, key_pair) in pairs {
            entities.insert(name, Address::from_public_key(&key_pair.public_key()))?;
        }
        Ok(entities)
    }
}

impl EntityResolver for StaticEntities {
    fn all(&self) -> &BTreeMap<String, Address> {
        &self.entities
    }
}

/// Entities discovered on disk
///
/// Each directory holds one sub-directory per entity, named after it, with
/// a signed descriptor at [`ENTITY_DESCRIPTOR_PATH`].
#[derive(Debug, Clone, Default)]
pub struct EntitiesDirectory {
    entities: StaticEntities,
}

impl EntitiesDirectory {
    /// Scan `dirs` in order
    pub fn load(dirs: &[PathBuf]) -> Result<Self> {
        let mut entities = StaticEntities::new();

        for dir in dirs {
            let mut children = std::fs::read_dir(dir)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<std::io::Result<Vec<_>>>()?;
            children.sort();

            for path in children.into_iter().filter(|p| p.is_dir()) {
                let file_name = path.file_name().unwrap_or_default();
                let name = file_name.to_str().ok_or_else(|| Error::InvalidEntity {
                    name: file_name.to_string_lossy().to_lowercase(),
                    reason: format!("directory name {} is not valid UTF-8", path.display()),
                })?;
                let address = load_descriptor(name, &path)?;
                entities.insert(name, address)?;
            }
        }

        Ok(Self { entities })
    }

    /// Number of entities found
    pub fn len(&self) -> usize {
        self.entities.entities.len()
    }

    /// No entities found
    pub fn is_empty(&self) -> bool {
        self.entities.entities.is_empty()
    }
}

impl EntityResolver for EntitiesDirectory {
    fn all(&self) -> &BTreeMap<String, Address> {
        self.entities.all()
    }
}

fn load_descriptor(name: &str, entity_dir: &Path) -> Result<Address> {
    let invalid = |reason: String| Error::InvalidEntity {
        name: name.to_lowercase(),
        reason,
    };

    let path = entity_dir.join(ENTITY_DESCRIPTOR_PATH);
    let content = std::fs::read(&path)
        .map_err(|e| invalid(format!("cannot read {}: {}", path.display(), e)))?;
    let envelope: SignedEnvelope = serde_json::from_slice(&content)
        .map_err(|e| invalid(format!("malformed envelope: {}", e)))?;
    let (signer, raw) = envelope
        .open(GENESIS_ENTITY_SIGNATURE_CONTEXT)
        .map_err(|e| invalid(format!("bad signature: {}", e)))?;
    let descriptor: EntityDescriptor = serde_json::from_slice(&raw)
        .map_err(|e| invalid(format!("malformed descriptor: {}", e)))?;

    if descriptor.id != signer {
        return Err(invalid(format!(
            "descriptor id {} is not the signer {}",
            descriptor.id, signer
        )));
    }

    Ok(Address::from_public_key(&descriptor.id))
}
