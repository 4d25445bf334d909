//! Row shapes written by the generator, one per table family.

use super::UpsertRow;
use crate::types::{EntityId, TopicId};
use chrono::NaiveDate;
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRow {
    pub topic_id: TopicId,
    pub name: String,
}

impl UpsertRow for TopicRow {
    fn values(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.topic_id as &dyn ToSql,
            &self.name,
        ]
    }
}

/// A user or an engineer: both carry an id and a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRow {
    pub id: EntityId,
    pub name: String,
    pub email: String,
}

impl UpsertRow for PersonRow {
    fn values(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.id as &dyn ToSql,
            &self.name,
            &self.email,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpecialtyRow {
    pub topic_id: TopicId,
    pub engineer_id: EntityId,
}

impl UpsertRow for SpecialtyRow {
    fn values(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.topic_id as &dyn ToSql,
            &self.engineer_id,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRow {
    pub feature_id: EntityId,
    pub title: String,
    pub environment: String, // production | development | testing
    pub summary: String,
    pub status: String, // open | in_progress | done
    pub submitted_on: NaiveDate,
    pub topic_id: TopicId,
    pub submitter_id: EntityId,
}

impl UpsertRow for FeatureRow {
    fn values(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.feature_id as &dyn ToSql,
            &self.title,
            &self.environment,
            &self.summary,
            &self.status,
            &self.submitted_on,
            &self.topic_id,
            &self.submitter_id,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionRow {
    pub criterion_id: EntityId,
    pub description: String,
    pub feature_id: EntityId,
}

impl UpsertRow for CriterionRow {
    fn values(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.criterion_id as &dyn ToSql,
            &self.description,
            &self.feature_id,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugRow {
    pub bug_id: EntityId,
    pub title: String,
    pub description: String,
    pub submitted_on: NaiveDate,
    pub status: String, // open | in_progress | resolved | closed
    pub topic_id: TopicId,
    pub submitter_id: EntityId,
}

impl UpsertRow for BugRow {
    fn values(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.bug_id as &dyn ToSql,
            &self.title,
            &self.description,
            &self.submitted_on,
            &self.status,
            &self.topic_id,
            &self.submitter_id,
        ]
    }
}

/// One engineer assigned to one feature or bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRow {
    pub request_id: EntityId,
    pub engineer_id: EntityId,
}

impl UpsertRow for AssignmentRow {
    fn values(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.request_id as &dyn ToSql,
            &self.engineer_id,
        ]
    }
}

/// A request as the store holds it, with its current assignees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRequest {
    pub id: EntityId,
    pub topic_id: TopicId,
    pub assignees: Vec<EntityId>,
}
