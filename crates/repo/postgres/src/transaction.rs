use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use nudge_core::outcome::{ActionType, Channel, Outcome};
use nudge_core::{Decision, Event, SendRequest, Suppression, UserTraits};
use nudge_repo::{RepoError, RepoTransaction};
use sqlx::{Postgres, Row, Transaction};

use crate::config::PostgresConfig;

pub(crate) struct PostgresTransaction {
    tx: Option<Transaction<'static, Postgres>>,
    config: Arc<PostgresConfig>,
}

impl PostgresTransaction {
    pub(crate) fn new(tx: Transaction<'static, Postgres>, config: Arc<PostgresConfig>) -> Self {
        Self {
            tx: Some(tx),
            config,
        }
    }

    fn conn(&mut self) -> Result<&mut Transaction<'static, Postgres>, RepoError> {
        self.tx.as_mut().ok_or(RepoError::TransactionClosed)
    }
}

fn map_sqlx(err: sqlx::Error) -> RepoError {
    RepoError::Backend(err.to_string())
}

#[async_trait]
impl RepoTransaction for PostgresTransaction {
    async fn add_event(&mut self, event: Event) -> Result<Event, RepoError> {
        let table = self.config.events_table();
        let properties = serde_json::to_value(&event.properties)
            .map_err(|e| RepoError::Serialization(e.to_string()))?;
        let traits = event.user_traits.as_ref();
        let sql = format!(
            "INSERT INTO {table} (id, user_id, event_type, event_timestamp, properties, created_at, has_traits, trait_email, trait_country, trait_marketing_opt_in, trait_risk_segment)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&sql)
            .bind(&event.id)
            .bind(&event.user_id)
            .bind(&event.event_type)
            .bind(event.event_timestamp)
            .bind(&properties)
            .bind(event.created_at)
            .bind(traits.is_some())
            .bind(traits.and_then(|t| t.email.clone()))
            .bind(traits.and_then(|t| t.country.clone()))
            .bind(traits.and_then(|t| t.marketing_opt_in))
            .bind(traits.and_then(|t| t.risk_segment.clone()))
            .execute(&mut **self.conn()?)
            .await
            .map_err(map_sqlx)?;
        Ok(event)
    }

    async fn get_event_by_id(&mut self, event_id: &str) -> Result<Option<Event>, RepoError> {
        let table = self.config.events_table();
        let sql = format!("SELECT * FROM {table} WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(event_id)
            .fetch_optional(&mut **self.conn()?)
            .await
            .map_err(map_sqlx)?;
        row.map(|r| row_to_event(&r)).transpose()
    }

    async fn list_events_by_user(&mut self, user_id: &str) -> Result<Vec<Event>, RepoError> {
        let table = self.config.events_table();
        let sql = format!("SELECT * FROM {table} WHERE user_id = $1 ORDER BY event_timestamp DESC");
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&mut **self.conn()?)
            .await
            .map_err(map_sqlx)?;
        rows.iter().map(row_to_event).collect()
    }

    async fn latest_event_by_user_and_type(
        &mut self,
        user_id: &str,
        event_type: &str,
    ) -> Result<Option<Event>, RepoError> {
        let table = self.config.events_table();
        let sql = format!(
            "SELECT * FROM {table}
             WHERE user_id = $1 AND event_type = $2
             ORDER BY event_timestamp DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(event_type)
            .fetch_optional(&mut **self.conn()?)
            .await
            .map_err(map_sqlx)?;
        row.map(|r| row_to_event(&r)).transpose()
    }

    async fn add_send_request(
        &mut self,
        send_request: SendRequest,
    ) -> Result<SendRequest, RepoError> {
        let table = self.config.send_requests_table();
        let sql = format!(
            "INSERT INTO {table} (id, user_id, event_id, event_timestamp, template_name, channel, reason, decided_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        sqlx::query(&sql)
            .bind(&send_request.id)
            .bind(&send_request.user_id)
            .bind(&send_request.event_id)
            .bind(send_request.event_timestamp)
            .bind(&send_request.template_name)
            .bind(send_request.channel.as_str())
            .bind(&send_request.reason)
            .bind(send_request.decided_at)
            .execute(&mut **self.conn()?)
            .await
            .map_err(map_sqlx)?;
        Ok(send_request)
    }

    async fn send_request_exists_for_user_and_template(
        &mut self,
        user_id: &str,
        template_name: &str,
    ) -> Result<bool, RepoError> {
        let table = self.config.send_requests_table();
        let sql =
            format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE user_id = $1 AND template_name = $2)");
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(template_name)
            .fetch_one(&mut **self.conn()?)
            .await
            .map_err(map_sqlx)?;
        Ok(exists)
    }

    async fn send_request_exists_in_day_so_far(
        &mut self,
        user_id: &str,
        template_name: &str,
        provided_ts: DateTime<Utc>,
    ) -> Result<bool, RepoError> {
        let table = self.config.send_requests_table();
        let day_start =
            Utc.from_utc_datetime(&provided_ts.date_naive().and_hms_opt(0, 0, 0).unwrap());
        let sql = format!(
            "SELECT EXISTS(
                SELECT 1 FROM {table}
                WHERE user_id = $1 AND template_name = $2
                  AND event_timestamp IS NOT NULL
                  AND event_timestamp > $3 AND event_timestamp < $4
            )"
        );
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(template_name)
            .bind(day_start)
            .bind(provided_ts)
            .fetch_one(&mut **self.conn()?)
            .await
            .map_err(map_sqlx)?;
        Ok(exists)
    }

    async fn list_send_requests_by_user(
        &mut self,
        user_id: &str,
    ) -> Result<Vec<SendRequest>, RepoError> {
        let table = self.config.send_requests_table();
        let sql = format!("SELECT * FROM {table} WHERE user_id = $1 ORDER BY decided_at ASC");
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&mut **self.conn()?)
            .await
            .map_err(map_sqlx)?;
        rows.iter().map(row_to_send_request).collect()
    }

    async fn add_suppression(
        &mut self,
        suppression: Suppression,
    ) -> Result<Suppression, RepoError> {
        let table = self.config.suppressions_table();
        let sql = format!(
            "INSERT INTO {table} (id, user_id, event_id, template_name, suppression_reason, decided_at)
             VALUES ($1, $2, $3, $4, $5, $6)"
        );
        sqlx::query(&sql)
            .bind(&suppression.id)
            .bind(&suppression.user_id)
            .bind(&suppression.event_id)
            .bind(&suppression.template_name)
            .bind(&suppression.suppression_reason)
            .bind(suppression.decided_at)
            .execute(&mut **self.conn()?)
            .await
            .map_err(map_sqlx)?;
        Ok(suppression)
    }

    async fn list_suppressions_by_user(
        &mut self,
        user_id: &str,
    ) -> Result<Vec<Suppression>, RepoError> {
        let table = self.config.suppressions_table();
        let sql = format!("SELECT * FROM {table} WHERE user_id = $1 ORDER BY decided_at ASC");
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&mut **self.conn()?)
            .await
            .map_err(map_sqlx)?;
        rows.iter().map(row_to_suppression).collect()
    }

    async fn add_decision(&mut self, decision: Decision) -> Result<Decision, RepoError> {
        let table = self.config.decisions_table();
        let sql = format!(
            "INSERT INTO {table} (id, user_id, event_id, event_type, matched_rule, action_type, outcome, reason, template_name, channel, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&sql)
            .bind(&decision.id)
            .bind(&decision.user_id)
            .bind(&decision.event_id)
            .bind(&decision.event_type)
            .bind(&decision.matched_rule)
            .bind(decision.action_type.as_str())
            .bind(decision.outcome.as_str())
            .bind(&decision.reason)
            .bind(&decision.template_name)
            .bind(decision.channel.map(Channel::as_str))
            .bind(decision.created_at)
            .execute(&mut **self.conn()?)
            .await
            .map_err(map_sqlx)?;
        Ok(decision)
    }

    async fn list_decisions_by_user(&mut self, user_id: &str) -> Result<Vec<Decision>, RepoError> {
        let table = self.config.decisions_table();
        let sql = format!("SELECT * FROM {table} WHERE user_id = $1 ORDER BY created_at ASC");
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&mut **self.conn()?)
            .await
            .map_err(map_sqlx)?;
        rows.iter().map(row_to_decision).collect()
    }

    async fn commit(mut self: Box<Self>) -> Result<(), RepoError> {
        let tx = self.tx.take().ok_or(RepoError::TransactionClosed)?;
        tx.commit().await.map_err(map_sqlx)
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), RepoError> {
        let tx = self.tx.take().ok_or(RepoError::TransactionClosed)?;
        tx.rollback().await.map_err(map_sqlx)
    }
}

fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<Event, RepoError> {
    let properties_json: serde_json::Value = row.try_get("properties").map_err(map_sqlx)?;
    let properties: HashMap<String, serde_json::Value> =
        serde_json::from_value(properties_json).map_err(|e| RepoError::Serialization(e.to_string()))?;
    let has_traits: bool = row.try_get("has_traits").map_err(map_sqlx)?;
    let id: String = row.try_get("id").map_err(map_sqlx)?;
    let user_traits = has_traits.then(|| UserTraits {
        event_id: id.clone(),
        email: row.try_get("trait_email").unwrap_or_default(),
        country: row.try_get("trait_country").unwrap_or_default(),
        marketing_opt_in: row.try_get("trait_marketing_opt_in").unwrap_or_default(),
        risk_segment: row.try_get("trait_risk_segment").unwrap_or_default(),
    });
    Ok(Event {
        id,
        user_id: row.try_get("user_id").map_err(map_sqlx)?,
        event_type: row.try_get("event_type").map_err(map_sqlx)?,
        event_timestamp: row.try_get("event_timestamp").map_err(map_sqlx)?,
        properties,
        created_at: row.try_get("created_at").map_err(map_sqlx)?,
        user_traits,
    })
}

fn row_to_send_request(row: &sqlx::postgres::PgRow) -> Result<SendRequest, RepoError> {
    let channel_str: String = row.try_get("channel").map_err(map_sqlx)?;
    let channel = Channel::from_str(&channel_str)
        .ok_or_else(|| RepoError::Backend(format!("unknown channel: {channel_str}")))?;
    Ok(SendRequest {
        id: row.try_get("id").map_err(map_sqlx)?,
        user_id: row.try_get("user_id").map_err(map_sqlx)?,
        event_id: row.try_get("event_id").map_err(map_sqlx)?,
        event_timestamp: row.try_get("event_timestamp").map_err(map_sqlx)?,
        template_name: row.try_get("template_name").map_err(map_sqlx)?,
        channel,
        reason: row.try_get("reason").map_err(map_sqlx)?,
        decided_at: row.try_get("decided_at").map_err(map_sqlx)?,
    })
}

fn row_to_suppression(row: &sqlx::postgres::PgRow) -> Result<Suppression, RepoError> {
    Ok(Suppression {
        id: row.try_get("id").map_err(map_sqlx)?,
        user_id: row.try_get("user_id").map_err(map_sqlx)?,
        event_id: row.try_get("event_id").map_err(map_sqlx)?,
        template_name: row.try_get("template_name").map_err(map_sqlx)?,
        suppression_reason: row.try_get("suppression_reason").map_err(map_sqlx)?,
        decided_at: row.try_get("decided_at").map_err(map_sqlx)?,
    })
}

fn row_to_decision(row: &sqlx::postgres::PgRow) -> Result<Decision, RepoError> {
    let action_type_str: String = row.try_get("action_type").map_err(map_sqlx)?;
    let action_type = ActionType::from_str(&action_type_str)
        .ok_or_else(|| RepoError::Backend(format!("unknown action_type: {action_type_str}")))?;
    let outcome_str: String = row.try_get("outcome").map_err(map_sqlx)?;
    let outcome = Outcome::from_str(&outcome_str)
        .ok_or_else(|| RepoError::Backend(format!("unknown outcome: {outcome_str}")))?;
    let channel: Option<String> = row.try_get("channel").map_err(map_sqlx)?;
    let channel = channel
        .map(|c| {
            Channel::from_str(&c).ok_or_else(|| RepoError::Backend(format!("unknown channel: {c}")))
        })
        .transpose()?;
    Ok(Decision {
        id: row.try_get("id").map_err(map_sqlx)?,
        user_id: row.try_get("user_id").map_err(map_sqlx)?,
        event_id: row.try_get("event_id").map_err(map_sqlx)?,
        event_type: row.try_get("event_type").map_err(map_sqlx)?,
        matched_rule: row.try_get("matched_rule").map_err(map_sqlx)?,
        action_type,
        outcome,
        reason: row.try_get("reason").map_err(map_sqlx)?,
        template_name: row.try_get("template_name").map_err(map_sqlx)?,
        channel,
        created_at: row.try_get("created_at").map_err(map_sqlx)?,
    })
}
