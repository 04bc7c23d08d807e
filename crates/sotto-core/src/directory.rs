//! User provisioning directory.
//!
//! The directory is a consumed collaborator: given a user id it answers with
//! key material: the full identity (including the private key) for the
//! local user, and the public half for anyone else. How the data gets there
//! is out of scope; [`StaticDirectory`] provisions a fixed user set with
//! freshly generated key pairs at startup and is immutable afterwards.

use sotto_crypto::{PrivateKey, PublicKey};
use sotto_proto::{ProtocolError, UserId};

/// One registered user with both halves of their key pair.
///
/// The private key is reachable only through [`UserIdentity::private_key`];
/// nothing in the workspace serializes or clones it.
#[derive(Debug)]
pub struct UserIdentity {
    /// Stable identifier.
    pub id: UserId,
    /// Human-readable display name.
    pub name: String,
    /// Public half of the key-agreement pair.
    pub public_key: PublicKey,
    private_key: PrivateKey,
}

impl UserIdentity {
    /// Assembles an identity from its parts.
    pub fn new(id: UserId, name: impl Into<String>, private_key: PrivateKey) -> Self {
        let public_key = private_key.public_key();
        Self { id, name: name.into(), public_key, private_key }
    }

    /// The private key. Never leaves the owning client process.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// The public view of this identity, as handed to counterparts.
    pub fn contact_card(&self) -> Contact {
        Contact { id: self.id.clone(), name: self.name.clone(), public_key: self.public_key }
    }
}

/// Public view of a registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Stable identifier.
    pub id: UserId,
    /// Human-readable display name.
    pub name: String,
    /// Public half of the key-agreement pair.
    pub public_key: PublicKey,
}

/// Lookup interface for provisioned users and keys.
pub trait Directory: Send + Sync {
    /// Full identity for `id`, private key included.
    ///
    /// Only meaningful for the local user; returns `None` for unknown ids.
    fn identity(&self, id: &UserId) -> Option<&UserIdentity>;

    /// Public key for any registered user.
    fn public_key(&self, id: &UserId) -> Option<&PublicKey>;

    /// Every registered user except `of`, i.e. `of`'s contact list.
    fn contacts(&self, of: &UserId) -> Vec<Contact>;
}

/// Fixed in-memory directory provisioned once at startup.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    users: Vec<UserIdentity>,
}

impl StaticDirectory {
    /// Provisions a directory with a fresh key pair per `(id, name)` entry.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if any id fails validation.
    pub fn provision(entries: &[(&str, &str)]) -> Result<Self, ProtocolError> {
        let mut users = Vec::with_capacity(entries.len());
        for (id, name) in entries {
            let id = UserId::new(*id)?;
            users.push(UserIdentity::new(id, *name, PrivateKey::generate()));
        }
        Ok(Self { users })
    }

    /// All provisioned identities.
    pub fn users(&self) -> impl Iterator<Item = &UserIdentity> {
        self.users.iter()
    }
}

impl Directory for StaticDirectory {
    fn identity(&self, id: &UserId) -> Option<&UserIdentity> {
        self.users.iter().find(|u| u.id == *id)
    }

    fn public_key(&self, id: &UserId) -> Option<&PublicKey> {
        self.identity(id).map(|u| &u.public_key)
    }

    fn contacts(&self, of: &UserId) -> Vec<Contact> {
        self.users.iter().filter(|u| u.id != *of).map(UserIdentity::contact_card).collect()
    }
}
