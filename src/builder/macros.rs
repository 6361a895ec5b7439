//! Macros for declaring event kinds.

/// Declare `static` [`EventKind`](crate::core::EventKind) items.
///
/// Each entry names the static and the kind's display name, optionally
/// followed by the parent kind it derives from.
///
/// # Example
///
/// ```
/// use hfsm::event_kinds;
///
/// event_kinds! {
///     pub TIMER = "Timer";
///     pub FAST_TIMER = "FastTimer": TIMER;
///     BREAK = "Break";
/// }
///
/// assert!(FAST_TIMER.is_a(&TIMER));
/// assert_eq!(BREAK.name(), "Break");
/// ```
#[macro_export]
macro_rules! event_kinds {
    (@kind $label:literal) => {
        $crate::core::EventKind::new($label)
    };
    (@kind $label:literal, $parent:path) => {
        $crate::core::EventKind::derived($label, &$parent)
    };
    (
        $(
            $(#[$meta:meta])*
            $vis:vis $name:ident = $label:literal $(: $parent:path)?
        );* $(;)?
    ) => {
        $(
            $(#[$meta])*
            $vis static $name: $crate::core::EventKind =
                $crate::event_kinds!(@kind $label $(, $parent)?);
        )*
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{Event, EventKind};

    event_kinds! {
        INPUT = "Input";
        KEY = "Key": INPUT;
        /// Documented kinds keep their attributes.
        ENTER = "Enter": KEY;
    }

    #[test]
    fn event_kinds_macro_declares_statics() {
        assert_eq!(INPUT.name(), "Input");
        assert_eq!(KEY.parent().map(EventKind::name), Some("Input"));
        assert!(ENTER.is_a(&INPUT));
        assert!(!INPUT.is_a(&ENTER));
    }

    #[test]
    fn declared_kinds_build_events() {
        let event = Event::new(&ENTER);
        assert_eq!(event.name(), "Enter");
    }

    #[test]
    fn event_kinds_supports_visibility() {
        mod inner {
            event_kinds! {
                pub(crate) VISIBLE = "Visible";
            }
        }

        assert_eq!(inner::VISIBLE.name(), "Visible");
    }
}
