//! Formations and their sessions.

use chain_clients_svm::instructions::{self, CreateSessionArgs, UpsertFormationArgs};
use chain_clients_svm::{FormationAccount, SessionAccount};
use chrono::Utc;
use tracing::debug;

use super::onchain::address;
use super::{next_local_id, report, AccessBackend, Mode};
use crate::error::{check_len, ClientError};
use crate::normalize::{formation_from_account, session_from_account};
use crate::types::{Formation, NewFormation, NewSession, Session};
use crate::wallet::Wallet;

/// Attaches each session to its formation, in session order.
fn join_sessions(mut formations: Vec<Formation>, sessions: Vec<Session>) -> Vec<Formation> {
    for session in sessions {
        if let Some(formation) = formations.iter_mut().find(|f| f.id == session.formation_id) {
            formation.sessions.push(session);
        }
    }
    formations
}

impl AccessBackend {
    fn validate_formation(&self, input: &NewFormation) -> Result<(), ClientError> {
        if input.title.trim().is_empty() {
            return Err(ClientError::InvalidInput("formation title is empty".to_string()));
        }
        check_len("title", &input.title, self.limits().title)?;
        check_len("description", &input.description, self.limits().description)?;
        if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
            if end < start {
                return Err(ClientError::InvalidInput(format!(
                    "formation ends ({}) before it starts ({})",
                    end, start
                )));
            }
        }
        Ok(())
    }

    /// Creates a formation.
    ///
    /// # Returns
    ///
    /// * `Ok(Formation)` - The new formation with its id and `created_at`
    /// * `Err(ClientError)` - Invalid input, wallet cannot sign, or submission failed
    pub async fn create_formation(
        &self,
        wallet: &Wallet,
        input: NewFormation,
    ) -> Result<Formation, ClientError> {
        debug!(title = %input.title, "create_formation");
        let result = self.create_formation_inner(wallet, input).await;
        report(
            result,
            &self.messages().success_formation,
            &self.messages().error_formation,
        )
    }

    async fn create_formation_inner(
        &self,
        wallet: &Wallet,
        input: NewFormation,
    ) -> Result<Formation, ClientError> {
        self.validate_formation(&input)?;

        match self.mode() {
            Mode::Local => self.store.update_formations(|formations| {
                let id = next_local_id(|id| formations.iter().any(|f| f.id == id));
                let formation = Formation {
                    id,
                    title: input.title,
                    description: input.description,
                    start_date: input.start_date,
                    end_date: input.end_date,
                    created_at: Utc::now(),
                    sessions: Vec::new(),
                };
                formations.push(formation.clone());
                Ok(formation)
            }),
            Mode::OnChain => {
                let id = next_local_id(|_| false);
                let storage = address(self.deriver.formation_storage())?;
                let formation_address = address(self.deriver.formation(&id))?;
                let ix = instructions::upsert_formation(
                    &self.program_id(),
                    &wallet.pubkey()?,
                    &storage,
                    &formation_address,
                    &UpsertFormationArgs {
                        formation_id: id.clone(),
                        title: input.title.clone(),
                        description: input.description.clone(),
                    },
                )
                .map_err(ClientError::failed)?;
                self.submit(wallet, "upsert_formation", vec![ix]).await?;

                Ok(Formation {
                    id,
                    title: input.title,
                    description: input.description,
                    start_date: input.start_date,
                    end_date: input.end_date,
                    created_at: Utc::now(),
                    sessions: Vec::new(),
                })
            }
        }
    }

    /// All formations, each with its sessions attached.
    pub async fn list_formations(&self) -> Result<Vec<Formation>, ClientError> {
        match self.mode() {
            Mode::Local => Ok(join_sessions(self.store.formations()?, self.store.sessions()?)),
            Mode::OnChain => {
                let formations = self
                    .scan_accounts::<FormationAccount>()
                    .await?
                    .iter()
                    .map(|(_, account)| formation_from_account(account))
                    .collect();
                let sessions = self.list_sessions(None).await?;
                Ok(join_sessions(formations, sessions))
            }
        }
    }

    /// Removes a formation and its sessions from the local store. The program
    /// keeps no deletion record, so this is local in both modes.
    pub fn delete_formation(&self, formation_id: &str) -> Result<Formation, ClientError> {
        debug!(formation_id, "delete_formation");
        let removed = self.store.update_formations(|formations| {
            let index = formations
                .iter()
                .position(|f| f.id == formation_id)
                .ok_or_else(|| ClientError::not_found("formation", formation_id))?;
            Ok(formations.remove(index))
        })?;
        self.store.update_sessions(|sessions| {
            sessions.retain(|s| s.formation_id != formation_id);
            Ok(())
        })?;
        Ok(removed)
    }

    // ========================================================================
    // SESSIONS
    // ========================================================================

    fn validate_session(&self, input: &NewSession) -> Result<(), ClientError> {
        if input.title.trim().is_empty() {
            return Err(ClientError::InvalidInput("session title is empty".to_string()));
        }
        check_len("title", &input.title, self.limits().title)?;
        check_len("location", &input.location, self.limits().location)?;
        if input.end_time <= input.start_time {
            return Err(ClientError::InvalidInput(format!(
                "session ends ({}) before or when it starts ({})",
                input.end_time, input.start_time
            )));
        }
        Ok(())
    }

    /// Schedules a session of an existing formation.
    ///
    /// # Returns
    ///
    /// * `Ok(Session)` - The new session
    /// * `Err(ClientError::NotFound)` - Local mode only: unknown formation
    /// * `Err(ClientError::InvalidInput)` - Empty title, or end not after start
    pub async fn create_session(&self, wallet: &Wallet, input: NewSession) -> Result<Session, ClientError> {
        debug!(formation_id = %input.formation_id, "create_session");
        let result = self.create_session_inner(wallet, input).await;
        report(
            result,
            &self.messages().success_session,
            &self.messages().error_session,
        )
    }

    async fn create_session_inner(&self, wallet: &Wallet, input: NewSession) -> Result<Session, ClientError> {
        self.validate_session(&input)?;

        match self.mode() {
            Mode::Local => {
                if !self.store.formations()?.iter().any(|f| f.id == input.formation_id) {
                    return Err(ClientError::not_found("formation", input.formation_id));
                }
                self.store.update_sessions(|sessions| {
                    let id = next_local_id(|id| sessions.iter().any(|s| s.id == id));
                    let session = Session {
                        id,
                        formation_id: input.formation_id,
                        title: input.title,
                        date: input.date,
                        start_time: input.start_time,
                        end_time: input.end_time,
                        location: input.location,
                        created_at: Utc::now(),
                    };
                    sessions.push(session.clone());
                    Ok(session)
                })
            }
            Mode::OnChain => {
                let id = next_local_id(|_| false);
                let storage = address(self.deriver.session_storage())?;
                let formation_address = address(self.deriver.formation(&input.formation_id))?;
                let session_address = address(self.deriver.session(&formation_address, &id))?;
                let start = input.date.and_time(input.start_time).and_utc();
                let end = input.date.and_time(input.end_time).and_utc();
                let ix = instructions::create_session(
                    &self.program_id(),
                    &wallet.pubkey()?,
                    &storage,
                    &session_address,
                    &CreateSessionArgs {
                        session_id: id.clone(),
                        formation_id: input.formation_id.clone(),
                        start_time: start.timestamp(),
                        end_time: end.timestamp(),
                        location: input.location.clone(),
                    },
                )
                .map_err(ClientError::failed)?;
                self.submit(wallet, "create_session", vec![ix]).await?;

                Ok(Session {
                    id,
                    formation_id: input.formation_id,
                    title: input.title,
                    date: input.date,
                    start_time: input.start_time,
                    end_time: input.end_time,
                    location: input.location,
                    created_at: Utc::now(),
                })
            }
        }
    }

    /// Sessions, optionally only those of one formation.
    pub async fn list_sessions(&self, formation_id: Option<&str>) -> Result<Vec<Session>, ClientError> {
        let sessions = match self.mode() {
            Mode::Local => self.store.sessions()?,
            Mode::OnChain => self
                .scan_accounts::<SessionAccount>()
                .await?
                .iter()
                .map(|(_, account)| session_from_account(account))
                .collect(),
        };
        Ok(sessions
            .into_iter()
            .filter(|s| formation_id.map_or(true, |id| s.formation_id == id))
            .collect())
    }
}
