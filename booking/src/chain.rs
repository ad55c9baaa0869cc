//! Finds the back-to-back follow-on request after a booking succeeds.
//
//  Pure search over the cycle's fetched request set.

use requests::BookingRequest;

/// Among the *other* requests of this cycle, find one that continues
/// the just-booked block: same account, venue, activity and date, still
/// schedulable, and starting exactly where the booked request ends.
///
/// The run loop books at most one such neighbor per cycle; chains are
/// never followed recursively.
pub fn find_contiguous<'a>(
    booked: &BookingRequest,
    all: &'a [BookingRequest],
) -> Option<&'a BookingRequest> {
    all.iter().find(|candidate| {
        candidate.id != booked.id
            && candidate.is_schedulable()
            && candidate.account_id == booked.account_id
            && candidate.target_date == booked.target_date
            && candidate.venue_slug == booked.venue_slug
            && candidate.activity_slug == booked.activity_slug
            && candidate.target_start_time == booked.target_end_time
    })
}
