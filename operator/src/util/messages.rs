/// User-friendly message to display in `status.message` whenever a resource
/// is in the `Pending` phase.
pub const PENDING: &str = "Resource first appeared to the controller.";

/// User-friendly message to display in `status.message` while the remote
/// object is being created.
pub const CREATING: &str = "Creating the remote object and waiting for it to become ready.";

/// User-friendly message to display in `status.message` while an existing
/// remote object is being adopted.
pub const IMPORTING: &str = "Importing the existing remote object.";

/// User-friendly message to display in `status.message` whenever the remote
/// object matches the declared configuration.
pub const READY: &str = "Remote object is ready and matches the declared configuration.";

/// User-friendly message to display in `status.message` while the remote
/// object is still settling after a change made outside this reconciliation.
pub const WAITING: &str = "Waiting for the remote object to settle.";

/// User-friendly message to display in `status.message` whenever the remote
/// object is being deleted.
pub const DELETING: &str = "Deleting the remote object.";

/// User-friendly message to display in `status.message` when the recorded
/// remote object no longer exists.
pub const VANISHED: &str = "Remote object no longer exists and will be recreated.";

/// User-friendly message to display in `status.message` after a remote
/// object was deleted so it can be recreated.
pub const REPLACED: &str = "Remote object was deleted and will be recreated.";

/// Message for the `Updating` phase, listing the drifted fields.
pub fn updating(fields: &[String]) -> String {
    format!("Updating drifted fields: {}.", fields.join(", "))
}

/// Message for the `Replacing` phase, listing the immutable fields
/// that changed.
pub fn replacing(fields: &[String]) -> String {
    format!(
        "Replacing the remote object because immutable fields changed: {}.",
        fields.join(", ")
    )
}

/// Message for the `ErrImportNotFound` phase.
pub fn import_not_found(id: &str) -> String {
    format!("Remote object '{}' referenced by importId does not exist.", id)
}
