// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sealed record storage, categories and tags.
//!
//! Only the id, category and timestamps of a record are stored in the
//! clear. Everything else lives inside the envelope.

use chrono::Utc;
use tracing::debug;
use zeroize::Zeroizing;

use keyward_core::{
    Category, Credential, KeywardError, LabelStore, RecordStore, RecordSummary, StoredRecord,
    Tag,
};

use crate::crypto::{self, Envelope};
use crate::lifecycle::Vault;
use crate::session::SessionContext;

impl Vault {
    /// Seal `plaintext` under the session key and store it as `id`.
    ///
    /// Overwriting keeps the original `created_at`.
    pub async fn put_record(
        &self,
        session: &SessionContext,
        id: &str,
        category: Option<&str>,
        plaintext: &[u8],
    ) -> Result<(), KeywardError> {
        let key = session.get()?;
        let envelope = crypto::seal(key.bytes(), plaintext)?.to_json()?;
        self.store_envelope(id, category, envelope).await
    }

    /// Store a structured credential.
    pub async fn put_credential(
        &self,
        session: &SessionContext,
        id: &str,
        category: Option<&str>,
        credential: &Credential,
    ) -> Result<(), KeywardError> {
        let key = session.get()?;
        let envelope = crypto::seal_json(key.bytes(), credential)?.to_json()?;
        self.store_envelope(id, category, envelope).await
    }

    async fn store_envelope(
        &self,
        id: &str,
        category: Option<&str>,
        envelope: String,
    ) -> Result<(), KeywardError> {
        if let Some(category) = category
            && !self
                .store
                .list_categories()
                .await?
                .iter()
                .any(|c| c.id == category)
        {
            return Err(KeywardError::NotFound(format!("category `{category}`")));
        }

        let now = Utc::now();
        let created_at = self
            .store
            .get(id)
            .await?
            .map(|existing| existing.created_at)
            .unwrap_or(now);
        self.store
            .put(&StoredRecord {
                id: id.to_string(),
                category: category.map(str::to_string),
                envelope,
                created_at,
                updated_at: now,
            })
            .await?;
        debug!(id = %id, "record stored");
        Ok(())
    }

    /// Decrypt a record. `None` if no record has that id.
    pub async fn get_record(
        &self,
        session: &SessionContext,
        id: &str,
    ) -> Result<Option<Zeroizing<Vec<u8>>>, KeywardError> {
        let key = session.get()?;
        let Some(record) = self.store.get(id).await? else {
            return Ok(None);
        };
        let envelope = Envelope::from_json(&record.envelope)?;
        Ok(Some(crypto::open(key.bytes(), &envelope)?))
    }

    pub async fn get_credential(
        &self,
        session: &SessionContext,
        id: &str,
    ) -> Result<Option<Credential>, KeywardError> {
        let key = session.get()?;
        let Some(record) = self.store.get(id).await? else {
            return Ok(None);
        };
        let envelope = Envelope::from_json(&record.envelope)?;
        Ok(Some(crypto::open_json(key.bytes(), &envelope)?))
    }

    /// Cleartext index of every record. Needs no key.
    pub async fn list_records(&self) -> Result<Vec<RecordSummary>, KeywardError> {
        Ok(self
            .store
            .list_records()
            .await?
            .iter()
            .map(RecordSummary::from)
            .collect())
    }

    /// Delete a record. Returns whether it existed.
    pub async fn delete_record(
        &self,
        session: &SessionContext,
        id: &str,
    ) -> Result<bool, KeywardError> {
        session.get()?;
        let existed = self.store.delete(id).await?;
        if existed {
            debug!(id = %id, "record deleted");
        }
        Ok(existed)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, KeywardError> {
        self.store.list_categories().await
    }

    /// Create a user category. Its id is the lowercased, dash-joined name.
    pub async fn add_category(&self, name: &str) -> Result<Category, KeywardError> {
        let category = Category {
            id: slug(name)?,
            name: name.trim().to_string(),
            is_default: false,
            created_at: Utc::now(),
        };
        self.store.put_category(&category).await?;
        Ok(category)
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>, KeywardError> {
        self.store.list_tags().await
    }

    pub async fn add_tag(&self, name: &str) -> Result<Tag, KeywardError> {
        let tag = Tag {
            id: slug(name)?,
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };
        self.store.put_tag(&tag).await?;
        Ok(tag)
    }
}

fn slug(name: &str) -> Result<String, KeywardError> {
    let slug = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        return Err(KeywardError::Config(format!("`{name}` is not a usable label")));
    }
    Ok(slug)
}

/// Mask a secret value for display: "hunt...er42" format.
///
/// Shows prefix (up to 4 chars) and suffix (up to 4 chars) with "..." in between.
/// Short values (< 10 chars) are fully masked as "****".
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_joins_words() {
        assert_eq!(slug("Work Accounts").unwrap(), "work-accounts");
        assert_eq!(slug("  bank/ATM  ").unwrap(), "bank-atm");
        assert!(slug(" -- ").is_err());
    }

    #[test]
    fn mask_short_value() {
        assert_eq!(mask_secret("abc"), "****");
    }

    #[test]
    fn mask_long_value() {
        assert_eq!(mask_secret("correct-horse-battery"), "corr...tery");
    }

    #[test]
    fn mask_multibyte_value() {
        assert_eq!(mask_secret("ééééééééééé"), "éééé...éééé");
    }
}
