//! # carehub-entity
//!
//! Domain entity models for CareHub. Database entities derive
//! `sqlx::FromRow` in addition to `Serialize`/`Deserialize`.

pub mod notification;
