//! Capability descriptor.
//!
//! Optional composite features are decided once, from [`CompositeOptions`],
//! into a [`Capabilities`] value that is passed explicitly to everything that
//! needs to ask "is this enabled". Nothing else reads the options.

use crate::RoleHint;

/// Host supplied composite configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeOptions {
    /// Offer a dialpad page for PSTN calls.
    pub pstn_dialing: bool,
    /// Route closed breakout rooms to their own page.
    pub breakout_rooms: bool,
    /// Route accepted transfers to the transfer page.
    pub call_transfer: bool,
    /// Route local hold to the hold page.
    pub hold: bool,
    /// Meeting role hint of the local user.
    pub role_hint: Option<RoleHint>,
    /// Hide errors recorded before the composite was mounted.
    pub ignore_premount_errors: bool,
}

impl Default for CompositeOptions {
    fn default() -> Self {
        Self {
            pstn_dialing: false,
            breakout_rooms: false,
            call_transfer: true,
            hold: true,
            role_hint: None,
            ignore_premount_errors: false,
        }
    }
}

/// Feature set enabled for one composite session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pstn_dialing: bool,
    breakout_rooms: bool,
    call_transfer: bool,
    hold: bool,
    camera: bool,
    ignore_premount_errors: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::from_options(&CompositeOptions::default())
    }
}

impl Capabilities {
    /// Compute the capability set for the given options.
    pub fn from_options(options: &CompositeOptions) -> Self {
        Self {
            pstn_dialing: options.pstn_dialing,
            breakout_rooms: options.breakout_rooms,
            call_transfer: options.call_transfer,
            hold: options.hold,
            camera: options.role_hint.is_none_or(RoleHint::allows_camera),
            ignore_premount_errors: options.ignore_premount_errors,
        }
    }

    /// Minimal set: no optional pages, camera allowed.
    pub fn minimal() -> Self {
        Self {
            pstn_dialing: false,
            breakout_rooms: false,
            call_transfer: false,
            hold: false,
            camera: true,
            ignore_premount_errors: false,
        }
    }

    /// Everything enabled.
    pub fn extended() -> Self {
        Self {
            pstn_dialing: true,
            breakout_rooms: true,
            call_transfer: true,
            hold: true,
            camera: true,
            ignore_premount_errors: false,
        }
    }

    /// Dialpad page available.
    pub fn pstn_dialing(&self) -> bool {
        self.pstn_dialing
    }

    /// Breakout-room-closed page available.
    pub fn breakout_rooms(&self) -> bool {
        self.breakout_rooms
    }

    /// Transfer page available.
    pub fn call_transfer(&self) -> bool {
        self.call_transfer
    }

    /// Hold page available.
    pub fn hold(&self) -> bool {
        self.hold
    }

    /// The local user may use a camera.
    pub fn camera(&self) -> bool {
        self.camera
    }

    /// Errors recorded before mount are hidden.
    pub fn ignore_premount_errors(&self) -> bool {
        self.ignore_premount_errors
    }
}
