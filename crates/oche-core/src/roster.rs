//! Roster management: guests and attendance

use oche_api::{Attendee, Participant, SessionStatus};
use oche_store::AuditEventType;
use oche_util::{AttendeeId, OcheError, Result, SessionId};
use tracing::info;

use crate::{CoreEvent, TrainingEngine};

impl TrainingEngine {
    fn require_attendee(&self, id: &AttendeeId) -> Result<Attendee> {
        self.store
            .get_attendee(id)?
            .ok_or_else(|| OcheError::not_found("Attendee"))
    }

    pub fn list_attendees(&self, session_id: &SessionId) -> Result<Vec<Attendee>> {
        self.require_session(session_id)?;
        Ok(self.store.list_attendees(session_id)?)
    }

    /// Add a named guest to a planned or active session.
    ///
    /// Regular players are only ever enrolled by `create_session`, so a
    /// missing name is rejected rather than treated as an enrollment.
    pub fn add_guest(&mut self, session_id: &SessionId, guest_name: Option<&str>) -> Result<Attendee> {
        let session = self.require_session(session_id)?;
        if !session.status.accepts_guests() {
            return Err(OcheError::invalid_state(format!(
                "cannot add guests to a {} session",
                session.status
            )));
        }

        let participant = guest_name.and_then(Participant::guest).ok_or_else(|| {
            OcheError::invalid_input(
                "a guest name is required; regular players are enrolled when the session is created",
            )
        })?;
        let name = participant.guest_name().unwrap_or_default().to_string();

        // Guests are identified by name within a session
        let folded = name.to_lowercase();
        let taken = self.store.list_attendees(session_id)?.iter().any(|a| {
            a.participant
                .guest_name()
                .is_some_and(|existing| existing.to_lowercase() == folded)
        });
        if taken {
            return Err(OcheError::conflict(format!(
                "a guest named {} is already on this session's roster",
                name
            )));
        }

        let attendee = Attendee {
            id: AttendeeId::new(),
            session_id: *session_id,
            participant,
            attended: true,
            created_at: oche_util::now(),
        };
        self.store.insert_attendee(&attendee)?;

        info!(session_id = %session_id, attendee_id = %attendee.id, guest = %name, "Guest added");
        self.audit(AuditEventType::GuestAdded {
            session_id: *session_id,
            attendee_id: attendee.id,
            guest_name: name,
        });
        self.emit(CoreEvent::RosterChanged {
            session_id: *session_id,
            attendee_id: attendee.id,
        });

        Ok(attendee)
    }

    /// Remove a guest while the session is still planned
    pub fn remove_attendee(&mut self, attendee_id: &AttendeeId) -> Result<()> {
        let attendee = self.require_attendee(attendee_id)?;
        if !attendee.is_guest() {
            return Err(OcheError::invalid_input(
                "cannot remove regular players, only guests can be removed",
            ));
        }

        let session = self.require_session(&attendee.session_id)?;
        if session.status != SessionStatus::Planned {
            return Err(OcheError::invalid_state(format!(
                "guests can only be removed from planned sessions (session is {})",
                session.status
            )));
        }

        self.store.delete_attendee(attendee_id)?;

        info!(session_id = %session.id, attendee_id = %attendee_id, "Attendee removed");
        self.audit(AuditEventType::AttendeeRemoved {
            session_id: session.id,
            attendee_id: *attendee_id,
        });
        self.emit(CoreEvent::RosterChanged {
            session_id: session.id,
            attendee_id: *attendee_id,
        });
        Ok(())
    }

    /// Mark a roster entry as present or absent
    pub fn set_attendance(&mut self, attendee_id: &AttendeeId, attended: bool) -> Result<Attendee> {
        let mut attendee = self.require_attendee(attendee_id)?;
        let session = self.require_session(&attendee.session_id)?;
        if !session.status.accepts_guests() {
            return Err(OcheError::invalid_state(format!(
                "attendance is fixed once a session is {}",
                session.status
            )));
        }

        if attendee.attended != attended {
            self.store.set_attended(attendee_id, attended)?;
            attendee.attended = attended;

            info!(session_id = %session.id, attendee_id = %attendee_id, attended, "Attendance changed");
            self.audit(AuditEventType::AttendanceChanged {
                session_id: session.id,
                attendee_id: *attendee_id,
                attended,
            });
            self.emit(CoreEvent::RosterChanged {
                session_id: session.id,
                attendee_id: *attendee_id,
            });
        }

        Ok(attendee)
    }
}
