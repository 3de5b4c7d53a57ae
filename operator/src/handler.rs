//! The contract every AgentCore resource handler implements.
//!
//! A handler translates one declarative spec into control plane calls.
//! It knows nothing about Kubernetes; the controller drives it.

use crate::util::Error;
use agentcore_types::TimeoutsSpec;
use async_trait::async_trait;
use std::{fmt::Debug, time::Duration};

/// Default time allowed for each of create, update and delete.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// How long each kind of mutation, including its wait, may take.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            create: DEFAULT_TIMEOUT,
            update: DEFAULT_TIMEOUT,
            delete: DEFAULT_TIMEOUT,
        }
    }
}

impl Timeouts {
    /// Overlays the durations set in `spec` onto `defaults`.
    pub fn resolve(spec: Option<&TimeoutsSpec>, defaults: Timeouts) -> Result<Timeouts, Error> {
        let Some(spec) = spec else {
            return Ok(defaults);
        };
        Ok(Timeouts {
            create: parse_or(spec.create.as_deref(), defaults.create)?,
            update: parse_or(spec.update.as_deref(), defaults.update)?,
            delete: parse_or(spec.delete.as_deref(), defaults.delete)?,
        })
    }
}

fn parse_or(value: Option<&str>, default: Duration) -> Result<Duration, Error> {
    match value {
        None => Ok(default),
        Some(value) => parse_duration::parse(value).map_err(|e| Error::DurationError {
            value: value.to_owned(),
            message: e.to_string(),
        }),
    }
}

/// Result of comparing a declared spec against the remote object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diff {
    /// The remote object matches.
    None,

    /// These fields differ and can be changed in place.
    Update(Vec<String>),

    /// These immutable fields differ; the remote object has to be
    /// deleted and created again.
    Replace(Vec<String>),
}

/// Collects drifted fields while comparing a spec with remote state.
#[derive(Default)]
pub struct Changes {
    update: Vec<String>,
    replace: Vec<String>,
}

impl Changes {
    pub fn update_if(mut self, drifted: bool, field: &str) -> Self {
        if drifted {
            self.update.push(field.to_owned());
        }
        self
    }

    pub fn replace_if(mut self, drifted: bool, field: &str) -> Self {
        if drifted {
            self.replace.push(field.to_owned());
        }
        self
    }

    /// Replacement wins over in-place updates.
    pub fn finish(self) -> Diff {
        if !self.replace.is_empty() {
            Diff::Replace(self.replace)
        } else if !self.update.is_empty() {
            Diff::Update(self.update)
        } else {
            Diff::None
        }
    }
}

/// True when an optional field is declared and differs from the remote
/// value. Undeclared optional fields never drift.
pub fn declared_drift<T: PartialEq>(declared: &Option<T>, actual: &Option<T>) -> bool {
    declared.is_some() && declared != actual
}

/// What the controller records in the status object about a remote
/// object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Observed {
    pub id: String,

    /// Id of the containing object for child kinds. Filled in by the
    /// controller from the spec.
    pub parent_id: Option<String>,

    pub arn: Option<String>,
    pub remote_status: Option<String>,

    /// False while the remote object is still transitioning.
    pub settled: bool,

    /// Set when the remote object is in a failure status.
    pub failure: Option<String>,
}

/// The remote object a child object lives in, e.g. the memory of a
/// strategy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parent {
    /// Spec field that names the parent.
    pub field: &'static str,
    pub id: String,
}

/// Receives the id of a new remote object as soon as the create call
/// returns, before the handler waits for it to settle.
#[async_trait]
pub trait CreationRecorder: Send + Sync {
    async fn created(&self, id: &str);
}

/// Records nothing.
pub struct Discard;

#[async_trait]
impl CreationRecorder for Discard {
    async fn created(&self, _id: &str) {}
}

/// Create, read, update, delete and import for one AgentCore kind.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    type Spec: Clone + Send + Sync;
    type State: Clone + Debug + PartialEq + Send + Sync;

    /// Kind name used in logs and errors.
    const KIND: &'static str;

    fn default_timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Creates the remote object and waits until it is usable. The id
    /// is passed to `recorder` before the wait starts. If the object was
    /// created but never became usable, the error is [`Error::Tainted`]
    /// carrying its id.
    async fn create_with(
        &self,
        spec: &Self::Spec,
        timeouts: &Timeouts,
        recorder: &dyn CreationRecorder,
    ) -> Result<Self::State, Error>;

    async fn create(&self, spec: &Self::Spec, timeouts: &Timeouts) -> Result<Self::State, Error> {
        self.create_with(spec, timeouts, &Discard).await
    }

    /// Reads the remote object. `None` means it does not exist.
    async fn read(&self, spec: &Self::Spec, id: &str) -> Result<Option<Self::State>, Error>;

    async fn update(
        &self,
        spec: &Self::Spec,
        state: &Self::State,
        timeouts: &Timeouts,
    ) -> Result<Self::State, Error>;

    /// Deletes the remote object and waits until it is gone. Deleting
    /// an object that does not exist succeeds.
    async fn delete(&self, spec: &Self::Spec, id: &str, timeouts: &Timeouts) -> Result<(), Error>;

    /// Adopts an existing remote object.
    async fn import(&self, spec: &Self::Spec, id: &str) -> Result<Self::State, Error> {
        self.read(spec, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} {}", Self::KIND, id)))
    }

    fn diff(&self, spec: &Self::Spec, state: &Self::State) -> Diff;

    fn observe(&self, state: &Self::State) -> Observed;

    /// The parent `spec` declares, for kinds that live inside another
    /// remote object. A different parent means a different object.
    fn parent(&self, _spec: &Self::Spec) -> Option<Parent> {
        None
    }

    /// `spec` pointed at `parent_id` instead of its declared parent, to
    /// reach an object that was created under an earlier parent.
    fn with_parent(&self, spec: &Self::Spec, _parent_id: &str) -> Self::Spec {
        spec.clone()
    }
}
