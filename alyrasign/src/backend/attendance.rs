//! Attendance check-in, check-out and history.

use chain_clients_svm::instructions::{self, RecordAttendanceArgs, UpdateAttendanceArgs};
use chain_clients_svm::AttendanceAccount;
use chrono::Utc;
use tracing::debug;

use super::onchain::address;
use super::{next_local_id, report, AccessBackend, Mode};
use crate::error::{check_len, ClientError};
use crate::normalize::attendance_from_account;
use crate::types::Attendance;
use crate::wallet::Wallet;

impl AccessBackend {
    /// Checks the wallet in to a session.
    ///
    /// # Arguments
    ///
    /// * `wallet` - Student wallet
    /// * `session_id` - Session attended
    /// * `is_present` - Presence flag
    /// * `note` - Optional note, bounded by `limits.note`
    ///
    /// # Returns
    ///
    /// * `Ok(Attendance)` - The new record
    /// * `Err(ClientError::OperationFailed)` - The student already checked in to this session
    pub async fn record_attendance(
        &self,
        wallet: &Wallet,
        session_id: &str,
        is_present: bool,
        note: &str,
    ) -> Result<Attendance, ClientError> {
        debug!(student = %wallet.address(), session_id, "record_attendance");
        let result = self.record_attendance_inner(wallet, session_id, is_present, note).await;
        report(
            result,
            &self.messages().success_attendance,
            &self.messages().error_attendance,
        )
    }

    async fn record_attendance_inner(
        &self,
        wallet: &Wallet,
        session_id: &str,
        is_present: bool,
        note: &str,
    ) -> Result<Attendance, ClientError> {
        check_len("note", note, self.limits().note)?;
        let student = wallet.address().to_string();

        match self.mode() {
            Mode::Local => self.store.update_attendances(|attendances| {
                if attendances
                    .iter()
                    .any(|a| a.student == student && a.session_id == session_id)
                {
                    return Err(ClientError::failed(format!(
                        "attendance already recorded for session {}",
                        session_id
                    )));
                }
                let now = Utc::now();
                let attendance = Attendance {
                    id: next_local_id(|id| attendances.iter().any(|a| a.id == id)),
                    session_id: session_id.to_string(),
                    student: student.clone(),
                    is_present,
                    check_in_time: now,
                    check_out_time: None,
                    note: note.to_string(),
                    created_at: now,
                    updated_at: now,
                };
                attendances.push(attendance.clone());
                Ok(attendance)
            }),
            Mode::OnChain => {
                let storage = address(self.deriver.attendance_storage())?;
                let record = address(self.deriver.attendance(&wallet.pubkey()?, session_id))?;
                let ix = instructions::record_attendance(
                    &self.program_id(),
                    &wallet.pubkey()?,
                    &storage,
                    &record,
                    &RecordAttendanceArgs {
                        session_id: session_id.to_string(),
                        is_present,
                        note: note.to_string(),
                    },
                )
                .map_err(ClientError::failed)?;
                self.submit(wallet, "record_attendance", vec![ix]).await?;

                let now = Utc::now();
                Ok(Attendance {
                    id: record.to_string(),
                    session_id: session_id.to_string(),
                    student,
                    is_present,
                    check_in_time: now,
                    check_out_time: None,
                    note: note.to_string(),
                    created_at: now,
                    updated_at: now,
                })
            }
        }
    }

    /// Checks the wallet out of a session: sets the check-out time and the
    /// presence flag, and replaces the note when a non-empty one is given.
    ///
    /// # Returns
    ///
    /// * `Ok(Attendance)` - The updated record
    /// * `Err(ClientError::NotFound)` - No check-in for this student and session
    pub async fn update_attendance(
        &self,
        wallet: &Wallet,
        session_id: &str,
        is_present: bool,
        note: &str,
    ) -> Result<Attendance, ClientError> {
        debug!(student = %wallet.address(), session_id, "update_attendance");
        let result = self.update_attendance_inner(wallet, session_id, is_present, note).await;
        report(
            result,
            &self.messages().success_attendance_update,
            &self.messages().error_attendance_update,
        )
    }

    async fn update_attendance_inner(
        &self,
        wallet: &Wallet,
        session_id: &str,
        is_present: bool,
        note: &str,
    ) -> Result<Attendance, ClientError> {
        check_len("note", note, self.limits().note)?;
        let student = wallet.address().to_string();

        let check_out = |attendance: &mut Attendance| {
            let now = Utc::now();
            attendance.is_present = is_present;
            attendance.check_out_time = Some(now);
            if !note.is_empty() {
                attendance.note = note.to_string();
            }
            attendance.updated_at = now;
        };

        match self.mode() {
            Mode::Local => self.store.update_attendances(|attendances| {
                let attendance = attendances
                    .iter_mut()
                    .find(|a| a.student == student && a.session_id == session_id)
                    .ok_or_else(|| ClientError::not_found("attendance", session_id))?;
                check_out(attendance);
                Ok(attendance.clone())
            }),
            Mode::OnChain => {
                let storage = address(self.deriver.attendance_storage())?;
                let record = address(self.deriver.attendance(&wallet.pubkey()?, session_id))?;
                let account = self
                    .fetch_account::<AttendanceAccount>(&record)
                    .await?
                    .ok_or_else(|| ClientError::not_found("attendance", session_id))?;

                let ix = instructions::update_attendance(
                    &self.program_id(),
                    &wallet.pubkey()?,
                    &storage,
                    &record,
                    &UpdateAttendanceArgs {
                        is_present,
                        note: note.to_string(),
                    },
                )
                .map_err(ClientError::failed)?;
                self.submit(wallet, "update_attendance", vec![ix]).await?;

                let mut attendance = attendance_from_account(&account);
                check_out(&mut attendance);
                Ok(attendance)
            }
        }
    }

    /// Attendance records, optionally only those of one session.
    pub async fn get_attendances(&self, session_id: Option<&str>) -> Result<Vec<Attendance>, ClientError> {
        let result = self.all_attendances().await.map(|all| {
            all.into_iter()
                .filter(|a| session_id.map_or(true, |id| a.session_id == id))
                .collect()
        });
        report(
            result,
            &self.messages().success_attendance_list,
            &self.messages().error_attendance_list,
        )
    }

    /// Attendance history of one student.
    pub async fn get_student_attendances(&self, student: &str) -> Result<Vec<Attendance>, ClientError> {
        let result = self.all_attendances().await.map(|all| {
            all.into_iter()
                .filter(|a| a.student == student)
                .collect()
        });
        report(
            result,
            &self.messages().success_attendance_list,
            &self.messages().error_attendance_list,
        )
    }

    async fn all_attendances(&self) -> Result<Vec<Attendance>, ClientError> {
        match self.mode() {
            Mode::Local => self.store.attendances(),
            Mode::OnChain => Ok(self
                .scan_accounts::<AttendanceAccount>()
                .await?
                .iter()
                .map(|(_, account)| attendance_from_account(account))
                .collect()),
        }
    }
}
