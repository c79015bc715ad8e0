use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    BookId, MemberId, Reservation, ReservationId, ReservationStatus, reservation,
};
use crate::ports::reservation_queue::{ReservationQueue, Result};

use super::InMemoryUnitOfWork;

#[async_trait]
impl ReservationQueue for InMemoryUnitOfWork {
    async fn insert_reservation(&mut self, new: &Reservation) -> Result<bool> {
        let duplicate = self.working.reservations.iter().any(|r| {
            r.is_pending() && r.member_id == new.member_id && r.book_id == new.book_id
        });
        if duplicate {
            return Ok(false);
        }
        self.working.reservations.push(new.clone());
        Ok(true)
    }

    async fn find_reservation(
        &mut self,
        reservation_id: ReservationId,
    ) -> Result<Option<Reservation>> {
        Ok(self
            .working
            .reservations
            .iter()
            .find(|r| r.reservation_id == reservation_id)
            .cloned())
    }

    async fn has_pending_reservation(
        &mut self,
        member_id: MemberId,
        book_id: BookId,
    ) -> Result<bool> {
        Ok(self
            .working
            .reservations
            .iter()
            .any(|r| r.is_pending() && r.member_id == member_id && r.book_id == book_id))
    }

    async fn next_pending_reservation(&mut self, book_id: BookId) -> Result<Option<Reservation>> {
        Ok(reservation::next_in_line(&self.working.reservations, book_id).cloned())
    }

    async fn transition_reservation(&mut self, updated: &Reservation) -> Result<bool> {
        let stored = self
            .working
            .reservations
            .iter_mut()
            .find(|r| r.reservation_id == updated.reservation_id);
        match stored {
            Some(stored) if stored.is_pending() => {
                *stored = updated.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_pending(&mut self, now: DateTime<Utc>, book_id: Option<BookId>) -> Result<u64> {
        let mut expired = 0;
        for r in self.working.reservations.iter_mut() {
            let in_scope = book_id.is_none_or(|book_id| r.book_id == book_id);
            if in_scope && r.is_lapsed(now) {
                r.status = ReservationStatus::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn reservations_for_member(&mut self, member_id: MemberId) -> Result<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .working
            .reservations
            .iter()
            .filter(|r| r.member_id == member_id)
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.reserved_at);
        Ok(reservations)
    }
}
