/// Database models for MarketDesk
///
/// Each model owns its CRUD operations as async functions taking a `&PgPool`.
///
/// # Models
///
/// - `account`: login accounts of every class
/// - `session`: login sessions
/// - `membership`: paid membership tier shared by accounts and pricing
/// - `master_data`: lookup tables maintained by administrators
/// - `pricing_config`: engagement pricing table
///
/// # Example
///
/// ```no_run
/// use marketdesk_shared::models::pricing_config::PricingConfig;
/// use marketdesk_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let configs = PricingConfig::list_active(&pool).await?;
/// # Ok(())
/// # }
/// ```

pub mod account;
pub mod master_data;
pub mod membership;
pub mod pricing_config;
pub mod session;

/// Distinguishes an absent field (no change) from an explicit `null` (clear)
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
