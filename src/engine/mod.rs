//! Engine facade - the entry point a request layer talks to.
//!
//! [`KknEngine`] holds the database connection and the external collaborators. Every
//! method takes the acting user, checks the policy, delegates to `core` and sends
//! notifications once the change is committed. A failed notification is logged and
//! never reported as a failure of the operation.

/// External collaborator traits and their default implementations
pub mod collaborators;

use crate::{
    core::{
        grading::{self, CertificateData, GradedRegistration},
        message,
        policy::{self, Action, Actor, Resource},
        posto::{self, BulkAssignResult, MemberUpdate, PostoDetail},
        registration::{
            self, DocumentRef, NewRegistration, ProfileFields, RegistrationFilter, ReviewDecision,
            ReviewOutcome,
        },
        registry::{self, LocationAvailability, NewLocation},
    },
    entities::{
        fiscal_year, grade, location, posto as posto_entity, posto_member, posto_message,
        registration as registration_entity, registration_document,
    },
    errors::{Error, Result},
    models::{MemberPosition, MemberStatus, PostoStatus},
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{instrument, warn};

pub use collaborators::{
    CertificateRenderer, CollaboratorError, DocumentStore, Event, Notifier, TracingNotifier,
};

/// A file uploaded with a registration.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Document name (e.g. `"krs"`)
    pub name: String,
    /// Original file name
    pub file_name: String,
    /// File contents
    pub bytes: Vec<u8>,
}

/// What a student sends when registering.
#[derive(Debug, Clone, Default)]
pub struct SubmissionRequest {
    /// Fiscal year applied to
    pub fiscal_year_id: i64,
    /// Requested location
    pub location_id: Option<i64>,
    /// Profile fields
    pub profile: ProfileFields,
    /// Attached files
    pub uploads: Vec<Upload>,
}

/// Shared engine state: storage plus collaborators.
///
/// Share one engine across tasks through an `Arc<KknEngine>`.
pub struct KknEngine {
    /// Database connection for all operations
    pub database: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    document_store: Option<Arc<dyn DocumentStore>>,
    renderer: Option<Arc<dyn CertificateRenderer>>,
}

impl KknEngine {
    /// Creates an engine that logs notifications and has no document store or
    /// renderer configured.
    #[must_use]
    pub fn new(database: DatabaseConnection) -> Self {
        Self {
            database,
            notifier: Arc::new(TracingNotifier),
            document_store: None,
            renderer: None,
        }
    }

    /// Replaces the notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Sets the document store used for registration uploads.
    #[must_use]
    pub fn with_document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.document_store = Some(store);
        self
    }

    /// Sets the certificate renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn CertificateRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    fn dispatch(&self, recipients: &[i64], event: &Event) {
        if recipients.is_empty() {
            return;
        }
        if let Err(e) = self.notifier.notify(recipients, event) {
            warn!(error = %e, ?event, "Notification failed");
        }
    }

    async fn registration_resource(
        &self,
        actor: &Actor,
        registration_id: i64,
    ) -> Result<(registration_entity::Model, Resource)> {
        let found = registration::require_registration(&self.database, registration_id).await?;
        let posto_dpl = match found.posto_id {
            Some(posto_id) => posto::require_posto(&self.database, posto_id).await?.dpl_id,
            None => None,
        };
        // Both the registration's DPL and its posto's DPL supervise it.
        let dpl_id = if posto_dpl == Some(actor.user_id) {
            posto_dpl
        } else {
            found.dpl_id.or(posto_dpl)
        };
        let resource = Resource::Registration {
            student_id: found.student_id,
            dpl_id,
        };
        Ok((found, resource))
    }

    async fn posto_resource(
        &self,
        actor: &Actor,
        posto_id: i64,
    ) -> Result<(posto_entity::Model, Resource)> {
        let found = posto::require_posto(&self.database, posto_id).await?;
        // Withdrawn and inactive members lose access to the board.
        let is_member = posto::find_member(&self.database, posto_id, actor.user_id)
            .await?
            .is_some_and(|member| member.status == MemberStatus::Active.as_str());
        let resource = Resource::Posto {
            dpl_id: found.dpl_id,
            is_member,
        };
        Ok((found, resource))
    }

    fn manage_posto(actor: &Actor) -> Result<()> {
        policy::authorize(
            actor,
            &Resource::Posto {
                dpl_id: None,
                is_member: false,
            },
            Action::Manage,
        )
    }

    // Registry

    /// Creates a fiscal year.
    pub async fn create_fiscal_year(
        &self,
        actor: &Actor,
        name: &str,
        year: i32,
    ) -> Result<fiscal_year::Model> {
        policy::authorize(actor, &Resource::Registry, Action::Manage)?;
        registry::create_fiscal_year(&self.database, name, year).await
    }

    /// Marks a fiscal year active.
    pub async fn set_active_fiscal_year(
        &self,
        actor: &Actor,
        fiscal_year_id: i64,
    ) -> Result<fiscal_year::Model> {
        policy::authorize(actor, &Resource::Registry, Action::Manage)?;
        registry::set_active_fiscal_year(&self.database, fiscal_year_id).await
    }

    /// Creates a location.
    pub async fn create_location(
        &self,
        actor: &Actor,
        input: NewLocation,
    ) -> Result<location::Model> {
        policy::authorize(actor, &Resource::Registry, Action::Manage)?;
        registry::create_location(&self.database, input).await
    }

    /// Changes a location's quota.
    pub async fn update_location_quota(
        &self,
        actor: &Actor,
        location_id: i64,
        quota: i32,
    ) -> Result<location::Model> {
        policy::authorize(actor, &Resource::Registry, Action::Manage)?;
        registry::update_location_quota(&self.database, location_id, quota).await
    }

    /// Deletes a location without dependents.
    pub async fn delete_location(&self, actor: &Actor, location_id: i64) -> Result<()> {
        policy::authorize(actor, &Resource::Registry, Action::Manage)?;
        registry::delete_location(&self.database, location_id).await
    }

    /// Lists the locations of a fiscal year with their remaining capacity.
    pub async fn location_overview(
        &self,
        actor: &Actor,
        fiscal_year_id: i64,
    ) -> Result<Vec<LocationAvailability>> {
        policy::authorize(actor, &Resource::Registry, Action::View)?;
        let mut overview = Vec::new();
        for found in registry::list_locations(&self.database, fiscal_year_id).await? {
            overview.push(registry::location_availability(&self.database, found.id).await?);
        }
        Ok(overview)
    }

    // Registration

    /// Submits the actor's own registration, storing uploads first.
    ///
    /// Uploads are written to the document store before the registration
    /// transaction; a rejected submission can leave stored files behind.
    #[instrument(skip(self, request), fields(student_id = actor.user_id))]
    pub async fn submit_registration(
        &self,
        actor: &Actor,
        request: SubmissionRequest,
    ) -> Result<registration_entity::Model> {
        policy::authorize(
            actor,
            &Resource::Registration {
                student_id: actor.user_id,
                dpl_id: None,
            },
            Action::Submit,
        )?;

        let mut documents = Vec::with_capacity(request.uploads.len());
        if !request.uploads.is_empty() {
            let store = self.document_store.as_ref().ok_or_else(|| Error::Config {
                message: "No document store configured".to_string(),
            })?;
            let namespace = format!("registrations/{}", actor.user_id);
            for upload in &request.uploads {
                let path = store.store(&namespace, &upload.file_name, &upload.bytes)?;
                documents.push(DocumentRef {
                    name: upload.name.clone(),
                    path,
                });
            }
        }

        let created = registration::submit(
            &self.database,
            NewRegistration {
                student_id: actor.user_id,
                fiscal_year_id: request.fiscal_year_id,
                location_id: request.location_id,
                profile: request.profile,
                documents,
            },
        )
        .await?;

        self.dispatch(
            &[created.student_id],
            &Event::RegistrationSubmitted {
                registration_id: created.id,
            },
        );
        Ok(created)
    }

    /// Reviews a registration and tells the student.
    pub async fn review_registration(
        &self,
        actor: &Actor,
        registration_id: i64,
        decision: ReviewDecision,
    ) -> Result<ReviewOutcome> {
        let (_, resource) = self.registration_resource(actor, registration_id).await?;
        policy::authorize(actor, &resource, Action::Review)?;

        let status = decision.status;
        let outcome = registration::review(&self.database, registration_id, decision).await?;
        self.dispatch(
            &[outcome.registration.student_id],
            &Event::RegistrationReviewed {
                registration_id,
                status,
            },
        );
        Ok(outcome)
    }

    /// Lists the registrations the actor may see.
    pub async fn list_registrations(
        &self,
        actor: &Actor,
        filter: &RegistrationFilter,
    ) -> Result<Vec<registration_entity::Model>> {
        registration::list_registrations(&self.database, policy::registration_scope(actor), filter)
            .await
    }

    /// Lists a registration's documents.
    pub async fn registration_documents(
        &self,
        actor: &Actor,
        registration_id: i64,
    ) -> Result<Vec<registration_document::Model>> {
        let (_, resource) = self.registration_resource(actor, registration_id).await?;
        policy::authorize(actor, &resource, Action::View)?;
        registration::documents(&self.database, registration_id).await
    }

    // Posto

    /// Creates a draft posto.
    pub async fn create_posto(
        &self,
        actor: &Actor,
        location_id: i64,
        fiscal_year_id: i64,
        dpl_id: Option<i64>,
    ) -> Result<posto_entity::Model> {
        Self::manage_posto(actor)?;
        posto::create_posto(&self.database, location_id, fiscal_year_id, dpl_id).await
    }

    /// Changes a posto's DPL.
    pub async fn assign_dpl(
        &self,
        actor: &Actor,
        posto_id: i64,
        dpl_id: Option<i64>,
    ) -> Result<posto_entity::Model> {
        Self::manage_posto(actor)?;
        posto::assign_dpl(&self.database, posto_id, dpl_id).await
    }

    /// Deletes a draft posto.
    pub async fn delete_posto(&self, actor: &Actor, posto_id: i64) -> Result<()> {
        Self::manage_posto(actor)?;
        posto::delete_posto(&self.database, posto_id).await
    }

    /// Adds a member and tells the student.
    pub async fn add_member(
        &self,
        actor: &Actor,
        posto_id: i64,
        student_id: i64,
        position: MemberPosition,
    ) -> Result<posto_member::Model> {
        Self::manage_posto(actor)?;
        let member = posto::add_member(&self.database, posto_id, student_id, position).await?;
        self.dispatch(
            &[student_id],
            &Event::MemberAssigned {
                posto_id,
                position: member.position.clone(),
            },
        );
        Ok(member)
    }

    /// Updates a member.
    pub async fn update_member(
        &self,
        actor: &Actor,
        posto_id: i64,
        member_id: i64,
        update: MemberUpdate,
    ) -> Result<posto_member::Model> {
        Self::manage_posto(actor)?;
        posto::update_member(&self.database, posto_id, member_id, update).await
    }

    /// Removes a member.
    pub async fn remove_member(&self, actor: &Actor, posto_id: i64, member_id: i64) -> Result<()> {
        Self::manage_posto(actor)?;
        posto::remove_member(&self.database, posto_id, member_id).await
    }

    /// Assigns many students; per-item failures are returned, not raised.
    pub async fn bulk_assign(
        &self,
        actor: &Actor,
        posto_id: i64,
        items: &[(i64, MemberPosition)],
    ) -> Result<BulkAssignResult> {
        Self::manage_posto(actor)?;
        let result = posto::bulk_assign(&self.database, posto_id, items).await?;
        for member in &result.assigned {
            self.dispatch(
                &[member.student_id],
                &Event::MemberAssigned {
                    posto_id,
                    position: member.position.clone(),
                },
            );
        }
        Ok(result)
    }

    /// Approved students of a fiscal year not yet in any posto.
    pub async fn list_available_students(
        &self,
        actor: &Actor,
        fiscal_year_id: i64,
        location_id: Option<i64>,
    ) -> Result<Vec<registration_entity::Model>> {
        Self::manage_posto(actor)?;
        posto::list_available_students(&self.database, fiscal_year_id, location_id).await
    }

    /// Moves a posto through its lifecycle.
    pub async fn set_posto_status(
        &self,
        actor: &Actor,
        posto_id: i64,
        status: PostoStatus,
    ) -> Result<posto_entity::Model> {
        Self::manage_posto(actor)?;
        posto::set_status(&self.database, posto_id, status).await
    }

    /// Loads a posto with its members.
    pub async fn posto_detail(&self, actor: &Actor, posto_id: i64) -> Result<PostoDetail> {
        let (_, resource) = self.posto_resource(actor, posto_id).await?;
        policy::authorize(actor, &resource, Action::View)?;
        posto::posto_detail(&self.database, posto_id).await
    }

    /// Posts on a posto's board and notifies the other members and the DPL.
    pub async fn post_message(
        &self,
        actor: &Actor,
        posto_id: i64,
        body: &str,
    ) -> Result<posto_message::Model> {
        let (_, resource) = self.posto_resource(actor, posto_id).await?;
        policy::authorize(actor, &resource, Action::Post)?;

        let posted = message::post_message(&self.database, posto_id, actor.user_id, body).await?;
        self.dispatch(
            &posted.recipients,
            &Event::MessagePosted {
                posto_id,
                message_id: posted.message.id,
            },
        );
        Ok(posted.message)
    }

    /// Lists a posto's board.
    pub async fn messages(
        &self,
        actor: &Actor,
        posto_id: i64,
    ) -> Result<Vec<posto_message::Model>> {
        let (_, resource) = self.posto_resource(actor, posto_id).await?;
        policy::authorize(actor, &resource, Action::View)?;
        message::messages(&self.database, posto_id).await
    }

    // Grading

    /// Records a grade and tells the student.
    pub async fn record_grade(
        &self,
        actor: &Actor,
        registration_id: i64,
        score: f64,
    ) -> Result<grade::Model> {
        let (found, resource) = self.registration_resource(actor, registration_id).await?;
        policy::authorize(actor, &resource, Action::Grade)?;

        let saved =
            grading::record_grade(&self.database, registration_id, score, Some(actor.user_id))
                .await?;
        self.dispatch(
            &[found.student_id],
            &Event::GradeRecorded {
                registration_id,
                letter: saved.letter.clone(),
            },
        );
        Ok(saved)
    }

    /// The actor's own grade.
    pub async fn my_grade(&self, actor: &Actor) -> Result<GradedRegistration> {
        policy::authorize(
            actor,
            &Resource::Registration {
                student_id: actor.user_id,
                dpl_id: None,
            },
            Action::View,
        )?;
        grading::my_grade(&self.database, actor.user_id).await
    }

    /// Certificate fields of a graded registration, dated today.
    pub async fn certificate_data(
        &self,
        actor: &Actor,
        registration_id: i64,
    ) -> Result<CertificateData> {
        let (_, resource) = self.registration_resource(actor, registration_id).await?;
        policy::authorize(actor, &resource, Action::View)?;
        grading::certificate_data(&self.database, registration_id, Utc::now().date_naive()).await
    }

    /// Renders the certificate of a graded registration.
    pub async fn render_certificate(&self, actor: &Actor, registration_id: i64) -> Result<Vec<u8>> {
        let data = self.certificate_data(actor, registration_id).await?;
        let renderer = self.renderer.as_ref().ok_or_else(|| Error::Config {
            message: "No certificate renderer configured".to_string(),
        })?;
        renderer.render(&data).map_err(Into::into)
    }
}
