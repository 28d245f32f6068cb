use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::connection::Connection;
use crate::error::QuizError;

/// A skill shared between two projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSkill {
    pub skill_id: String,
    pub skill_name: String,
    pub project_id: String,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub shared_with_all_projects: bool,
}

/// Cross-project skill sharing.
pub trait ShareSkills {
    /// Creates or replaces the share of `skill_id` with `share_to_project_id`.
    fn share_skill(
        &self,
        project_id: &str,
        skill_id: &str,
        share_to_project_id: &str,
    ) -> impl Future<Output = Result<(), QuizError>> + Send;

    fn delete_skill_share(
        &self,
        project_id: &str,
        skill_id: &str,
        share_to_project_id: &str,
    ) -> impl Future<Output = Result<(), QuizError>> + Send;

    /// Skills this project shares with others.
    fn shared_skills(
        &self,
        project_id: &str,
    ) -> impl Future<Output = Result<Vec<SharedSkill>, QuizError>> + Send;

    /// Skills other projects share with this one.
    fn shared_with_me_skills(
        &self,
        project_id: &str,
    ) -> impl Future<Output = Result<Vec<SharedSkill>, QuizError>> + Send;
}

fn share_segments<'a>(
    project_id: &'a str,
    skill_id: &'a str,
    share_to_project_id: &'a str,
) -> [&'a str; 8] {
    [
        "admin",
        "projects",
        project_id,
        "skills",
        skill_id,
        "shared",
        "projects",
        share_to_project_id,
    ]
}

impl ShareSkills for Connection {
    #[instrument(level = "info", skip(self))]
    async fn share_skill(
        &self,
        project_id: &str,
        skill_id: &str,
        share_to_project_id: &str,
    ) -> Result<(), QuizError> {
        let url = self.endpoint(share_segments(project_id, skill_id, share_to_project_id))?;
        self.send(self.client().put(url)).await?;
        log::info!(
            "Shared skill {} of {} with {}",
            skill_id,
            project_id,
            share_to_project_id
        );
        Ok(())
    }

    #[instrument(level = "info", skip(self))]
    async fn delete_skill_share(
        &self,
        project_id: &str,
        skill_id: &str,
        share_to_project_id: &str,
    ) -> Result<(), QuizError> {
        let url = self.endpoint(share_segments(project_id, skill_id, share_to_project_id))?;
        self.send(self.client().delete(url)).await?;
        log::info!(
            "Revoked share of skill {} of {} with {}",
            skill_id,
            project_id,
            share_to_project_id
        );
        Ok(())
    }

    async fn shared_skills(&self, project_id: &str) -> Result<Vec<SharedSkill>, QuizError> {
        let url = self.endpoint(["admin", "projects", project_id, "shared"])?;
        Ok(self.send(self.client().get(url)).await?.json().await?)
    }

    async fn shared_with_me_skills(&self, project_id: &str) -> Result<Vec<SharedSkill>, QuizError> {
        let url = self.endpoint(["admin", "projects", project_id, "sharedWithMe"])?;
        Ok(self.send(self.client().get(url)).await?.json().await?)
    }
}
