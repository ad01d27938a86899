// libs/availability-cell/src/services/repository.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    AvailabilityClosure, AvailabilityError, DaySchedule, ProviderSchedulingPolicy, WeeklySchedule,
};

/// Storage for provider-owned scheduling configuration.
///
/// `replace_week` must be all-or-nothing: either all seven rows are written or none.
#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    async fn replace_week(
        &self,
        provider_id: Uuid,
        days: Vec<DaySchedule>,
    ) -> Result<WeeklySchedule, AvailabilityError>;

    async fn get_week(&self, provider_id: Uuid) -> Result<Option<WeeklySchedule>, AvailabilityError>;

    async fn upsert_policy(
        &self,
        policy: ProviderSchedulingPolicy,
    ) -> Result<ProviderSchedulingPolicy, AvailabilityError>;

    async fn get_policy(
        &self,
        provider_id: Uuid,
    ) -> Result<Option<ProviderSchedulingPolicy>, AvailabilityError>;

    async fn upsert_closure(
        &self,
        closure: AvailabilityClosure,
    ) -> Result<AvailabilityClosure, AvailabilityError>;

    async fn delete_closure(&self, provider_id: Uuid, date: NaiveDate) -> Result<bool, AvailabilityError>;

    async fn get_closure(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AvailabilityClosure>, AvailabilityError>;
}

#[derive(Default)]
pub struct InMemoryAvailabilityRepository {
    weeks: RwLock<HashMap<Uuid, WeeklySchedule>>,
    policies: RwLock<HashMap<Uuid, ProviderSchedulingPolicy>>,
    closures: RwLock<HashMap<(Uuid, NaiveDate), AvailabilityClosure>>,
}

impl InMemoryAvailabilityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityRepository for InMemoryAvailabilityRepository {
    async fn replace_week(
        &self,
        provider_id: Uuid,
        mut days: Vec<DaySchedule>,
    ) -> Result<WeeklySchedule, AvailabilityError> {
        days.sort_by_key(|day| day.day_of_week);

        let week = WeeklySchedule {
            provider_id,
            days,
            updated_at: Utc::now(),
        };

        self.weeks.write().await.insert(provider_id, week.clone());
        Ok(week)
    }

    async fn get_week(&self, provider_id: Uuid) -> Result<Option<WeeklySchedule>, AvailabilityError> {
        Ok(self.weeks.read().await.get(&provider_id).cloned())
    }

    async fn upsert_policy(
        &self,
        policy: ProviderSchedulingPolicy,
    ) -> Result<ProviderSchedulingPolicy, AvailabilityError> {
        self.policies.write().await.insert(policy.provider_id, policy.clone());
        Ok(policy)
    }

    async fn get_policy(
        &self,
        provider_id: Uuid,
    ) -> Result<Option<ProviderSchedulingPolicy>, AvailabilityError> {
        Ok(self.policies.read().await.get(&provider_id).cloned())
    }

    async fn upsert_closure(
        &self,
        closure: AvailabilityClosure,
    ) -> Result<AvailabilityClosure, AvailabilityError> {
        self.closures
            .write()
            .await
            .insert((closure.provider_id, closure.closure_date), closure.clone());
        Ok(closure)
    }

    async fn delete_closure(&self, provider_id: Uuid, date: NaiveDate) -> Result<bool, AvailabilityError> {
        Ok(self.closures.write().await.remove(&(provider_id, date)).is_some())
    }

    async fn get_closure(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AvailabilityClosure>, AvailabilityError> {
        Ok(self.closures.read().await.get(&(provider_id, date)).cloned())
    }
}
