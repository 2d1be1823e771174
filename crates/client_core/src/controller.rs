//! View-state controller for a single viewed profile.
//!
//! One controller backs one profile page. [`ProfileStatusController::open`]
//! starts a visit: it checks for a self-visit, looks the profile up, logs the
//! visit and keeps the relationship status fresh through a [`PeriodicTask`].
//! [`ProfileStatusController::render`] derives what the page should show.

use std::{
    ops::ControlFlow,
    sync::{Arc, Weak},
    time::Duration,
};

use shared::{
    domain::{BlockedBy, RelationshipStatus, UserId},
    error::{keys, ProfileError, ProfileErrorKind, ViewError},
    protocol::{
        CheckProfileRequest, LogVisitRequest, SearchProfileRequest, UserPatch, ViewedProfile,
    },
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    api::{ProfileApi, ProfileLookup},
    error::EndpointError,
    i18n::MessageCatalog,
    navigation::{Navigator, Route},
    scheduler::PeriodicTask,
    session::UserStore,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(7000);
const EVENT_CAPACITY: usize = 64;
const POLL_TASK: &str = "relationship-status";

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub poll_interval: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewPhase {
    #[default]
    Idle,
    Loading,
    Error(ViewError),
    /// Profile loaded. Whether it may be shown still depends on
    /// [`RelationshipStatus::is_blocked_by`].
    Ready,
    Redirected(Route),
}

impl ViewPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_) | Self::Redirected(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileRender {
    Error {
        message: String,
    },
    Skeleton,
    Content {
        profile: ViewedProfile,
        is_match: bool,
        is_liked: bool,
        is_blocked: bool,
    },
    Redirected(Route),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    PhaseChanged(ViewPhase),
    ProfileLoaded(ViewedProfile),
    StatusUpdated(RelationshipStatus),
    Redirected(Route),
}

#[derive(Debug, Default)]
struct ViewState {
    generation: u64,
    profile_id: Option<UserId>,
    phase: ViewPhase,
    loading: bool,
    profile: Option<ViewedProfile>,
    status: RelationshipStatus,
}

impl ViewState {
    fn is_live(&self, generation: u64) -> bool {
        self.generation == generation && !self.phase.is_terminal()
    }

    /// Status polls only apply to a loaded, still-current profile.
    fn accepts_status(&self, generation: u64) -> bool {
        self.generation == generation && self.phase == ViewPhase::Ready
    }
}

pub struct ProfileStatusController {
    api: Arc<dyn ProfileApi>,
    navigator: Arc<dyn Navigator>,
    session: UserStore,
    catalog: Arc<MessageCatalog>,
    options: ControllerOptions,
    view: Mutex<ViewState>,
    poller: Mutex<Option<PeriodicTask>>,
    events: broadcast::Sender<ViewEvent>,
}

impl ProfileStatusController {
    pub fn new(
        api: Arc<dyn ProfileApi>,
        navigator: Arc<dyn Navigator>,
        session: UserStore,
        catalog: Arc<MessageCatalog>,
        options: ControllerOptions,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            api,
            navigator,
            session,
            catalog,
            options,
            view: Mutex::new(ViewState::default()),
            poller: Mutex::new(None),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    /// Starts a visit of `profile_id`, replacing whatever this view showed
    /// before, and returns the phase the visit settled in.
    pub async fn open(self: &Arc<Self>, profile_id: &str) -> ViewPhase {
        let profile_id = UserId::from(profile_id.trim());
        let generation = {
            let mut view = self.view.lock().await;
            let generation = view.generation + 1;
            *view = ViewState {
                generation,
                profile_id: Some(profile_id.clone()),
                ..ViewState::default()
            };
            generation
        };
        self.stop_polling().await;
        self.emit(ViewEvent::PhaseChanged(ViewPhase::Idle));

        let Some(user) = self.session.current().await else {
            debug!(profile_id = %profile_id, "no signed-in user; profile view stays idle");
            return ViewPhase::Idle;
        };

        if !profile_id.is_empty() && user.id == profile_id {
            self.redirect(generation, Route::OwnProfile).await;
            return self.phase().await;
        }

        if let Some(profile) = self.load_profile(generation, &profile_id, &user.id).await {
            if user.id != profile.id {
                self.spawn_visit_log(user.id.clone(), profile.id.clone());
            }
            self.start_polling(generation, user.id, profile.id).await;
        }
        self.phase().await
    }

    /// Tears the view down. Polling is stopped before this returns; lookups
    /// still in flight are left to finish and their results dropped.
    pub async fn close(&self) {
        {
            let mut view = self.view.lock().await;
            view.generation += 1;
        }
        self.stop_polling().await;
    }

    /// Looks `profile_id` up on behalf of `user_id`. Any user patch in the
    /// response is merged into the session, soft error or not.
    pub async fn fetch_profile(
        &self,
        profile_id: &UserId,
        user_id: &UserId,
    ) -> Result<ViewedProfile, ProfileError> {
        if profile_id.is_empty() {
            return Err(ProfileError::MissingIdentifier);
        }

        let request = SearchProfileRequest {
            user_id: user_id.clone(),
            profile_to_find_id: profile_id.clone(),
        };
        match self.api.search_profile(&request).await {
            Ok(ProfileLookup::Found { profile, user }) => {
                self.merge_user(user).await;
                Ok(profile)
            }
            Ok(ProfileLookup::Refused { message, user }) => {
                info!(profile_id = %profile_id, message = %message, "profile lookup refused");
                self.merge_user(user).await;
                Err(ProfileError::Soft(message))
            }
            Err(err) => {
                warn!(profile_id = %profile_id, "profile lookup failed: {err}");
                Err(fetch_failure(err))
            }
        }
    }

    /// Records that `visitor_id` looked at `visited_id`. Failures are logged
    /// and otherwise ignored.
    pub async fn log_visit(&self, visitor_id: &UserId, visited_id: &UserId) {
        log_visit_with(self.api.as_ref(), visitor_id, visited_id).await;
    }

    /// Asks for the current relationship status and applies it to the view if
    /// the view is still showing `profile_id`. Returns the status that was
    /// applied. Responses are applied in the order they arrive. Nothing is
    /// requested until the profile has loaded.
    pub async fn poll_status(
        &self,
        user_id: &UserId,
        profile_id: &UserId,
    ) -> Option<RelationshipStatus> {
        let generation = {
            let view = self.view.lock().await;
            if view.profile_id.as_ref() != Some(profile_id) || view.phase != ViewPhase::Ready {
                return None;
            }
            view.generation
        };
        self.fetch_and_apply_status(generation, user_id, profile_id)
            .await
    }

    /// Swaps the displayed profile wholesale, e.g. after the content view
    /// edited it. Ignored unless a profile is loaded.
    pub async fn replace_profile(&self, profile: ViewedProfile) -> bool {
        {
            let mut view = self.view.lock().await;
            if view.phase != ViewPhase::Ready {
                return false;
            }
            view.profile = Some(profile.clone());
        }
        self.emit(ViewEvent::ProfileLoaded(profile));
        true
    }

    pub async fn phase(&self) -> ViewPhase {
        self.view.lock().await.phase.clone()
    }

    pub async fn status(&self) -> RelationshipStatus {
        self.view.lock().await.status
    }

    pub async fn profile(&self) -> Option<ViewedProfile> {
        self.view.lock().await.profile.clone()
    }

    pub async fn error(&self) -> Option<ViewError> {
        match &self.view.lock().await.phase {
            ViewPhase::Error(err) => Some(err.clone()),
            _ => None,
        }
    }

    pub async fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub async fn render(&self) -> ProfileRender {
        let global_loading = self.session.is_global_loading().await;
        let signed_in = self.session.current_id().await.is_some();
        let view = self.view.lock().await;

        match &view.phase {
            ViewPhase::Redirected(route) => return ProfileRender::Redirected(*route),
            ViewPhase::Error(err) => {
                return ProfileRender::Error {
                    message: self.catalog.translate(&err.key),
                }
            }
            _ => {}
        }

        if view.loading
            || global_loading
            || !signed_in
            || view.status.is_blocked_by != BlockedBy::No
        {
            return ProfileRender::Skeleton;
        }

        match &view.profile {
            Some(profile) => ProfileRender::Content {
                profile: profile.clone(),
                is_match: view.status.is_match,
                is_liked: view.status.is_liked,
                is_blocked: view.status.is_blocked,
            },
            None => ProfileRender::Skeleton,
        }
    }

    async fn load_profile(
        &self,
        generation: u64,
        profile_id: &UserId,
        user_id: &UserId,
    ) -> Option<ViewedProfile> {
        {
            let mut view = self.view.lock().await;
            if !view.is_live(generation) {
                return None;
            }
            view.loading = true;
            view.phase = ViewPhase::Loading;
        }
        self.emit(ViewEvent::PhaseChanged(ViewPhase::Loading));

        let result = self.fetch_profile(profile_id, user_id).await;

        let mut view = self.view.lock().await;
        if !view.is_live(generation) {
            debug!(
                profile_id = %profile_id,
                phase = ?view.phase,
                "dropping profile lookup for a view that moved on"
            );
            return None;
        }
        view.loading = false;
        match result {
            Ok(profile) => {
                view.profile = Some(profile.clone());
                view.phase = ViewPhase::Ready;
                drop(view);
                self.emit(ViewEvent::ProfileLoaded(profile.clone()));
                self.emit(ViewEvent::PhaseChanged(ViewPhase::Ready));
                Some(profile)
            }
            Err(err) => {
                let phase = ViewPhase::Error(err.into());
                view.phase = phase.clone();
                drop(view);
                self.emit(ViewEvent::PhaseChanged(phase));
                None
            }
        }
    }

    async fn merge_user(&self, patch: Option<UserPatch>) {
        if let Some(patch) = patch {
            self.session.merge(&patch).await;
        }
    }

    fn spawn_visit_log(&self, visitor_id: UserId, visited_id: UserId) {
        let api = self.api.clone();
        tokio::spawn(async move {
            log_visit_with(api.as_ref(), &visitor_id, &visited_id).await;
        });
    }

    /// Installs the poller for visit `generation`, unless a newer visit has
    /// already taken over the view.
    async fn start_polling(self: &Arc<Self>, generation: u64, user_id: UserId, profile_id: UserId) {
        let mut poller = self.poller.lock().await;
        if !self.view.lock().await.accepts_status(generation) {
            debug!(profile_id = %profile_id, "not polling for a superseded visit");
            return;
        }

        let controller: Weak<Self> = Arc::downgrade(self);
        let task = PeriodicTask::spawn(
            POLL_TASK,
            self.options.poll_interval,
            move || {
                let controller = controller.clone();
                let user_id = user_id.clone();
                let profile_id = profile_id.clone();
                async move {
                    let Some(controller) = controller.upgrade() else {
                        return ControlFlow::Break(());
                    };
                    controller
                        .fetch_and_apply_status(generation, &user_id, &profile_id)
                        .await;
                    if controller.view.lock().await.accepts_status(generation) {
                        ControlFlow::Continue(())
                    } else {
                        ControlFlow::Break(())
                    }
                }
            },
        );

        let previous = poller.replace(task);
        drop(poller);
        if let Some(previous) = previous {
            previous.cancel().await;
        }
    }

    async fn stop_polling(&self) {
        let task = self.poller.lock().await.take();
        if let Some(task) = task {
            let name = task.name();
            task.cancel().await;
            debug!(task = name, "relationship polling stopped");
        }
    }

    async fn fetch_and_apply_status(
        &self,
        generation: u64,
        user_id: &UserId,
        profile_id: &UserId,
    ) -> Option<RelationshipStatus> {
        if !self.view.lock().await.accepts_status(generation) {
            return None;
        }

        let request = CheckProfileRequest {
            user_id: user_id.clone(),
            profile_to_check_id: profile_id.clone(),
        };
        match self.api.check_profile(&request).await {
            Ok(response) => {
                let status = RelationshipStatus::from(response);
                self.apply_status(generation, status).await.then_some(status)
            }
            Err(err) => {
                warn!(
                    kind = ?ProfileErrorKind::SilentError,
                    profile_id = %profile_id,
                    "relationship status poll failed: {err}"
                );
                None
            }
        }
    }

    /// Overwrites all five flags at once, then re-derives the block redirect.
    async fn apply_status(&self, generation: u64, status: RelationshipStatus) -> bool {
        {
            let mut view = self.view.lock().await;
            if !view.accepts_status(generation) {
                return false;
            }
            view.status = status;
        }
        self.emit(ViewEvent::StatusUpdated(status));

        if status.is_blocked_by == BlockedBy::Yes {
            self.redirect(generation, Route::Dashboard).await;
        }
        true
    }

    /// Moves the view to `Redirected` and pushes `route`, at most once per
    /// visit.
    async fn redirect(&self, generation: u64, route: Route) {
        {
            let mut view = self.view.lock().await;
            if !view.is_live(generation) {
                return;
            }
            view.phase = ViewPhase::Redirected(route);
        }
        info!(route = %route, "redirecting away from profile view");
        self.navigator.push(route);
        self.emit(ViewEvent::PhaseChanged(ViewPhase::Redirected(route)));
        self.emit(ViewEvent::Redirected(route));
    }

    fn emit(&self, event: ViewEvent) {
        let _ = self.events.send(event);
    }
}

async fn log_visit_with(api: &dyn ProfileApi, visitor_id: &UserId, visited_id: &UserId) {
    let request = LogVisitRequest {
        visitor_id: visitor_id.clone(),
        visited_user_id: visited_id.clone(),
    };
    match api.log_visit(&request).await {
        Ok(()) => debug!(visitor_id = %visitor_id, visited_id = %visited_id, "visit logged"),
        Err(err) => warn!(
            kind = ?ProfileErrorKind::SilentError,
            visitor_id = %visitor_id,
            visited_id = %visited_id,
            "failed to log visit: {err}"
        ),
    }
}

fn fetch_failure(err: EndpointError) -> ProfileError {
    match err {
        EndpointError::Status { error, .. } => ProfileError::Transport(
            error.unwrap_or_else(|| keys::ERROR_FETCHING_PROFILE.to_string()),
        ),
        other => ProfileError::Transport(other.to_string()),
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
