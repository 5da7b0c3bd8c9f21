use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::entities::{
    facility_age, facility_covering_type, facility_owning_type, facility_paying_type,
    facility_type,
};
use crate::errors::{is_unique_violation, ServiceError};

/// Owning type assigned when a facility does not name one
pub const DEFAULT_OWNING_TYPE: &str = "другая";

/// Paying types given to imported rows that leave the column empty
pub const DEFAULT_IMPORT_PAYING_TYPES: [&str; 1] = ["бюджетные"];

/// Age groups given to imported rows that leave the column empty
pub const DEFAULT_IMPORT_AGES: [&str; 4] = ["взрослые", "дети", "молодёжь", "пенсионеры"];

/// Independent classification dimension of a facility
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    EnumIter,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaxonomyAxis {
    Type,
    OwningType,
    CoveringType,
    PayingType,
    Age,
}

impl TaxonomyAxis {
    /// Vocabulary seeded on a fresh installation
    pub fn seed_terms(self) -> &'static [&'static str] {
        match self {
            TaxonomyAxis::Type => &[
                "плоскостные",
                "спортивные залы",
                "бассейны",
                "крытые катки",
                "стрелковые объекты",
                "рекреационные",
                "другие",
            ],
            TaxonomyAxis::OwningType => &["субъект рф", "муниципальная", "федеральная", "другая"],
            TaxonomyAxis::CoveringType => &[
                "спротивный линолеум",
                "ковролин",
                "спортивный паркет",
                "деревянный паркет",
                "бесшовные полиуретановые полы",
                "рулонные покрытия",
                "искусственная трава",
                "гравийное",
                "искусственный газон",
                "травяное",
                "резиновое",
                "бетонное",
                "асфальт",
                "другое",
            ],
            TaxonomyAxis::PayingType => &["платные", "бюджетные"],
            TaxonomyAxis::Age => &["дети", "молодёжь", "взрослые", "пенсионеры"],
        }
    }
}

/// Canonical spelling of a label: trimmed and lower-cased.
pub fn normalize_label(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Storage for the terms of one axis. Implemented once per lookup table.
pub trait TaxonomyTerm: EntityTrait {
    type Active: ActiveModelTrait<Entity = Self> + Send;

    const AXIS: TaxonomyAxis;

    fn name_column() -> Self::Column;

    fn new_term(name: String) -> Self::Active;

    fn term_name(model: Self::Model) -> String;
}

macro_rules! taxonomy_term {
    ($module:ident, $axis:expr) => {
        impl TaxonomyTerm for $module::Entity {
            type Active = $module::ActiveModel;

            const AXIS: TaxonomyAxis = $axis;

            fn name_column() -> $module::Column {
                $module::Column::Name
            }

            fn new_term(name: String) -> $module::ActiveModel {
                $module::ActiveModel { name: Set(name) }
            }

            fn term_name(model: $module::Model) -> String {
                model.name
            }
        }
    };
}

taxonomy_term!(facility_type, TaxonomyAxis::Type);
taxonomy_term!(facility_owning_type, TaxonomyAxis::OwningType);
taxonomy_term!(facility_covering_type, TaxonomyAxis::CoveringType);
taxonomy_term!(facility_paying_type, TaxonomyAxis::PayingType);
taxonomy_term!(facility_age, TaxonomyAxis::Age);

/// Exact lookup of an already canonical name.
pub async fn lookup<E, C>(conn: &C, name: &str) -> Result<Option<String>, ServiceError>
where
    E: TaxonomyTerm,
    C: ConnectionTrait,
{
    let found = E::find()
        .filter(E::name_column().eq(name))
        .one(conn)
        .await?;
    Ok(found.map(E::term_name))
}

/// Inserts a canonical name inside a savepoint. When a concurrent writer won
/// the race the savepoint is rolled back and the existing row is read instead.
pub async fn insert_or_reread<E, C>(conn: &C, name: &str) -> Result<String, ServiceError>
where
    E: TaxonomyTerm,
    E::Model: IntoActiveModel<E::Active>,
    C: ConnectionTrait + TransactionTrait,
{
    let savepoint = conn.begin().await?;
    match E::insert(E::new_term(name.to_string()))
        .exec_without_returning(&savepoint)
        .await
    {
        Ok(_) => {
            savepoint.commit().await?;
            debug!(axis = %E::AXIS, term = name, "created taxonomy term");
            Ok(name.to_string())
        }
        Err(err) if is_unique_violation(&err) => {
            savepoint.rollback().await?;
            lookup::<E, C>(conn, name).await?.ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "{} term '{}' conflicted on insert but cannot be read",
                    E::AXIS,
                    name
                ))
            })
        }
        Err(err) => {
            savepoint.rollback().await?;
            Err(err.into())
        }
    }
}

/// Get-or-create of the canonical term for `raw`.
pub async fn resolve_term<E, C>(conn: &C, raw: &str) -> Result<String, ServiceError>
where
    E: TaxonomyTerm,
    E::Model: IntoActiveModel<E::Active>,
    C: ConnectionTrait + TransactionTrait,
{
    let name = normalize_label(raw);
    if name.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "{} label must not be blank",
            E::AXIS
        )));
    }

    match lookup::<E, C>(conn, &name).await? {
        Some(existing) => Ok(existing),
        None => insert_or_reread::<E, C>(conn, &name).await,
    }
}

/// Resolves `raw` on the given axis, creating the term when it is new.
pub async fn resolve<C>(conn: &C, axis: TaxonomyAxis, raw: &str) -> Result<String, ServiceError>
where
    C: ConnectionTrait + TransactionTrait,
{
    match axis {
        TaxonomyAxis::Type => resolve_term::<facility_type::Entity, C>(conn, raw).await,
        TaxonomyAxis::OwningType => resolve_term::<facility_owning_type::Entity, C>(conn, raw).await,
        TaxonomyAxis::CoveringType => {
            resolve_term::<facility_covering_type::Entity, C>(conn, raw).await
        }
        TaxonomyAxis::PayingType => resolve_term::<facility_paying_type::Entity, C>(conn, raw).await,
        TaxonomyAxis::Age => resolve_term::<facility_age::Entity, C>(conn, raw).await,
    }
}

/// Resolves a list of labels, dropping duplicates that share a canonical name.
pub async fn resolve_all<C, S>(
    conn: &C,
    axis: TaxonomyAxis,
    labels: &[S],
) -> Result<Vec<String>, ServiceError>
where
    C: ConnectionTrait + TransactionTrait,
    S: AsRef<str>,
{
    let mut resolved: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let name = resolve(conn, axis, label.as_ref()).await?;
        if !resolved.contains(&name) {
            resolved.push(name);
        }
    }
    Ok(resolved)
}

async fn list_terms<E, C>(conn: &C) -> Result<Vec<String>, ServiceError>
where
    E: TaxonomyTerm,
    C: ConnectionTrait,
{
    let rows = E::find()
        .order_by_asc(E::name_column())
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(E::term_name).collect())
}

/// Taxonomy lookups exposed to the HTTP layer and startup seeding
#[derive(Clone)]
pub struct TaxonomyService {
    db: Arc<DatabaseConnection>,
}

impl TaxonomyService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All canonical names of an axis, sorted
    #[instrument(skip(self))]
    pub async fn list(&self, axis: TaxonomyAxis) -> Result<Vec<String>, ServiceError> {
        let db = &*self.db;
        match axis {
            TaxonomyAxis::Type => list_terms::<facility_type::Entity, _>(db).await,
            TaxonomyAxis::OwningType => list_terms::<facility_owning_type::Entity, _>(db).await,
            TaxonomyAxis::CoveringType => list_terms::<facility_covering_type::Entity, _>(db).await,
            TaxonomyAxis::PayingType => list_terms::<facility_paying_type::Entity, _>(db).await,
            TaxonomyAxis::Age => list_terms::<facility_age::Entity, _>(db).await,
        }
    }

    /// Get-or-create in its own transaction
    #[instrument(skip(self))]
    pub async fn resolve(&self, axis: TaxonomyAxis, raw: &str) -> Result<String, ServiceError> {
        let txn = self.db.begin().await?;
        let name = resolve(&txn, axis, raw).await?;
        txn.commit().await?;
        Ok(name)
    }

    /// Makes sure the default vocabulary exists. Safe to run repeatedly.
    #[instrument(skip(self))]
    pub async fn seed_defaults(&self) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        for axis in TaxonomyAxis::iter() {
            resolve_all(&txn, axis, axis.seed_terms()).await?;
        }
        txn.commit().await?;
        info!("Taxonomy vocabulary seeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases_cyrillic() {
        assert_eq!(normalize_label("  Бассейны "), "бассейны");
        assert_eq!(normalize_label("СУБЪЕКТ РФ"), "субъект рф");
    }

    #[test_case::test_case("Плоскостные", "плоскостные" ; "capitalized")]
    #[test_case::test_case("\tКрытые  катки\n", "крытые  катки" ; "inner spacing kept")]
    #[test_case::test_case("   ", "" ; "blank")]
    #[test_case::test_case("Молодёжь", "молодёжь" ; "yo letter")]
    fn normalize_examples(raw: &str, expected: &str) {
        assert_eq!(normalize_label(raw), expected);
    }

    #[test]
    fn axis_names_are_snake_case() {
        assert_eq!(TaxonomyAxis::OwningType.to_string(), "owning_type");
        assert_eq!(
            serde_json::to_string(&TaxonomyAxis::PayingType).unwrap(),
            "\"paying_type\""
        );
    }

    #[test]
    fn seed_terms_are_canonical() {
        for axis in TaxonomyAxis::iter() {
            for term in axis.seed_terms() {
                assert_eq!(normalize_label(term), *term, "{axis} term {term}");
            }
        }
        assert!(TaxonomyAxis::OwningType
            .seed_terms()
            .contains(&DEFAULT_OWNING_TYPE));
    }
}
