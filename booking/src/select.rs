//! Picks the best slot out of a listing according to the request's
//! ranked court preferences.
//
//  This module is deliberately pure: no async, no IO.

use provider::Slot;
use requests::BookingRequest;

/// Court number extracted from a free-text court name.
///
/// "Court 5", "court-11" and "badminton-court-05" normalize to "5",
/// "11" and "5". Names without digits have no number.
pub fn court_number(name: &str) -> Option<String> {
    let digits: String = name.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let trimmed = digits.trim_start_matches('0');
    Some(if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    })
}

/// Choose one slot and a human-readable label for it.
///
/// Preference order wins over availability order: preference 1 is
/// checked against the whole listing before preference 2 is considered
/// at all. Within one court number the first slot in provider order is
/// taken. With no matching (or no given) preference, the first listed
/// slot wins, labeled by its own court number or its raw name.
///
/// Returns `None` only for an empty listing.
pub fn select_slot<'a>(
    request: &BookingRequest,
    slots: &'a [Slot],
) -> Option<(&'a Slot, String)> {
    if slots.is_empty() {
        return None;
    }

    for preference in request.preferred_courts() {
        let Some(wanted) = court_number(preference) else {
            continue;
        };
        if let Some(slot) = slots
            .iter()
            .find(|s| court_number(&s.name).as_deref() == Some(wanted.as_str()))
        {
            return Some((slot, format!("Court {wanted}")));
        }
    }

    let first = &slots[0];
    let label = match court_number(&first.name) {
        Some(number) => format!("Court {number}"),
        None => first.name.clone(),
    };
    Some((first, label))
}
