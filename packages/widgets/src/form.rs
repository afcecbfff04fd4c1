//! The report modal and its form.

use crime_scope_crime_models::{GeoPoint, ReportFormValues};

/// A dialog that can be opened and closed.
pub trait ModalWidget {
    /// Opens the dialog.
    fn show(&self);

    /// Closes the dialog.
    fn hide(&self);
}

/// The report form inside the modal.
pub trait ReportFormWidget {
    /// Writes the selected point into the hidden coordinate inputs.
    fn set_coordinates(&self, point: GeoPoint);

    /// Replaces the text of the address input.
    fn set_address(&self, address: &str);

    /// Current raw input values.
    fn values(&self) -> ReportFormValues;

    /// Clears every input.
    fn reset(&self);

    /// Disables the submit button and shows a spinner while `true`.
    fn set_submitting(&self, submitting: bool);
}
