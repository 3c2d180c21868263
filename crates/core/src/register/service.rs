//! Register service orchestrating the write and read paths.
//!
//! Every write goes through the same pipeline:
//! 1. Authorization gate for the entry type
//! 2. Item existence (receipt, dispense, disposal)
//! 3. Correction target lookup
//! 4. Entry validation
//! 5. Locked append (balance check, sequence assignment, persistence)
//! 6. Audit event

use std::sync::Arc;

use custodia_shared::RegisterSettings;
use custodia_shared::types::{AuthorizationId, ItemId, PageRequest, PageResponse, UserId};
use serde_json::json;

use super::audit::AuditEvent;
use super::authorization::{AuthorizationTier, AuthorizedPerson};
use super::balance::{BalanceEngine, IntegrityViolation, ItemBalance, ItemState, Replayer};
use super::error::RegisterError;
use super::registry::AuthorizationRegistry;
use super::request::{
    CorrectionRequest, DispenseRequest, DisposalRequest, EntryRequest, InventoryCheckRequest,
    ReceiptRequest,
};
use super::store::{AuditRecorder, AuthorizationStore, ItemDirectory, LedgerStore};
use super::types::{Actor, EntryType, LedgerEntry};
use super::validation::EntryFactory;

/// Outcome of replaying an item's whole register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    /// The verified item.
    pub item_id: ItemId,
    /// Stored state the replay was checked against.
    pub stored: ItemState,
    /// Number of entries replayed.
    pub entries_checked: u64,
    /// First inconsistency found, if any.
    pub violation: Option<IntegrityViolation>,
}

impl VerificationReport {
    /// Returns true if the register replays to its stored state.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.violation.is_none()
    }
}

/// Controlled-substance register service.
pub struct RegisterService<L, A, D, R>
where
    L: LedgerStore,
    A: AuthorizationStore,
    D: ItemDirectory,
    R: AuditRecorder,
{
    ledger: Arc<L>,
    registry: AuthorizationRegistry<A>,
    items: Arc<D>,
    audit: Arc<R>,
    settings: RegisterSettings,
}

impl<L, A, D, R> Clone for RegisterService<L, A, D, R>
where
    L: LedgerStore,
    A: AuthorizationStore,
    D: ItemDirectory,
    R: AuditRecorder,
{
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            registry: self.registry.clone(),
            items: Arc::clone(&self.items),
            audit: Arc::clone(&self.audit),
            settings: self.settings.clone(),
        }
    }
}

impl<L, A, D, R> RegisterService<L, A, D, R>
where
    L: LedgerStore,
    A: AuthorizationStore,
    D: ItemDirectory,
    R: AuditRecorder,
{
    /// Create a new register service.
    #[must_use]
    pub fn new(
        ledger: Arc<L>,
        authorizations: Arc<A>,
        items: Arc<D>,
        audit: Arc<R>,
        settings: RegisterSettings,
    ) -> Self {
        Self {
            ledger,
            registry: AuthorizationRegistry::new(authorizations),
            items,
            audit,
            settings,
        }
    }

    /// The authorization registry backing this service.
    #[must_use]
    pub const fn registry(&self) -> &AuthorizationRegistry<A> {
        &self.registry
    }

    /// Record stock received from a supplier. Requires `full`.
    pub async fn receive(
        &self,
        actor: &Actor,
        request: ReceiptRequest,
    ) -> Result<LedgerEntry, RegisterError> {
        self.record(actor, request.into()).await
    }

    /// Record a dispensing for a patient. Requires `dispense_only`.
    pub async fn dispense(
        &self,
        actor: &Actor,
        request: DispenseRequest,
    ) -> Result<LedgerEntry, RegisterError> {
        self.record(actor, request.into()).await
    }

    /// Record a witnessed disposal. Requires `full`.
    pub async fn dispose(
        &self,
        actor: &Actor,
        request: DisposalRequest,
    ) -> Result<LedgerEntry, RegisterError> {
        self.record(actor, request.into()).await
    }

    /// Record a correction of an earlier entry. Requires `full`.
    pub async fn correct(
        &self,
        actor: &Actor,
        request: CorrectionRequest,
    ) -> Result<LedgerEntry, RegisterError> {
        self.record(actor, request.into()).await
    }

    /// Record a physical count. Requires `full`.
    ///
    /// The balance is left as it is; a difference between the count and the
    /// book balance is logged and reported to the audit trail.
    pub async fn inventory_check(
        &self,
        actor: &Actor,
        request: InventoryCheckRequest,
    ) -> Result<LedgerEntry, RegisterError> {
        self.record(actor, request.into()).await
    }

    /// Run any write request through the register pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the pipeline. Nothing is written unless
    /// every step succeeds; audit failures are logged and do not fail the
    /// call.
    pub async fn record(
        &self,
        actor: &Actor,
        request: EntryRequest,
    ) -> Result<LedgerEntry, RegisterError> {
        let entry_type = request.entry_type();

        self.registry
            .authorize(actor.user_id, AuthorizationTier::required_for(entry_type))
            .await?;

        if entry_type.requires_known_item() && !self.items.item_exists(request.item_id).await? {
            return Err(RegisterError::ItemNotFound(request.item_id));
        }

        let correction_target = match request.corrects_entry_id() {
            Some(id) => self.ledger.find_entry(id).await?,
            None => None,
        };

        let draft =
            EntryFactory::build(request, actor, correction_target.as_ref(), &self.settings)?;

        let entry = match self.ledger.append(draft).await {
            Ok(entry) => entry,
            Err(RegisterError::InsufficientBalance { available, requested }) => {
                tracing::warn!(
                    user_id = %actor.user_id,
                    entry_type = %entry_type,
                    %available,
                    %requested,
                    "Register entry rejected: insufficient balance"
                );
                return Err(RegisterError::InsufficientBalance { available, requested });
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            item_id = %entry.item_id,
            entry_id = %entry.id,
            entry_type = %entry_type,
            sequence_number = entry.sequence_number,
            running_balance = %entry.running_balance,
            performed_by = %entry.performed_by,
            "Register entry appended"
        );

        let mut event = AuditEvent::for_entry(&entry);
        if entry_type == EntryType::InventoryCheck {
            event = Self::annotate_inventory_check(&entry, event);
        }
        if let Err(e) = self.audit.record(event).await {
            tracing::warn!(
                item_id = %entry.item_id,
                entry_id = %entry.id,
                error = %e,
                "Failed to record audit event"
            );
        }

        Ok(entry)
    }

    fn annotate_inventory_check(entry: &LedgerEntry, event: AuditEvent) -> AuditEvent {
        // The check does not move the balance, so the running balance is the
        // book balance at the time of the count.
        let book_balance = entry.running_balance;
        let discrepancy = BalanceEngine::discrepancy(entry.quantity, book_balance);

        if !discrepancy.is_zero() {
            tracing::warn!(
                item_id = %entry.item_id,
                entry_id = %entry.id,
                counted = %entry.quantity,
                %book_balance,
                %discrepancy,
                "Inventory check discrepancy"
            );
        }

        event
            .with_metadata("counted_quantity", json!(entry.quantity.to_string()))
            .with_metadata("book_balance", json!(book_balance.to_string()))
            .with_metadata("discrepancy", json!(discrepancy.to_string()))
    }

    /// Read an item's register, oldest entry first. Requires `view_only`.
    pub async fn register(
        &self,
        actor: &Actor,
        item_id: ItemId,
        page: PageRequest,
    ) -> Result<PageResponse<LedgerEntry>, RegisterError> {
        self.registry
            .authorize(actor.user_id, AuthorizationTier::required_for_read())
            .await?;

        let page = page.normalized(self.settings.default_page_size, self.settings.max_page_size);
        let (entries, total) = self.ledger.list_by_item(item_id, page).await?;

        Ok(PageResponse::new(entries, page.page, page.per_page, total))
    }

    /// Current balance of an item. No authorization is required.
    pub async fn balance(&self, item_id: ItemId) -> Result<ItemBalance, RegisterError> {
        self.ledger.current_state(item_id).await
    }

    /// Replay an item's whole register against its stored state.
    /// Requires `view_only`.
    ///
    /// Entries appended while the check runs are outside its scope.
    pub async fn verify_item(
        &self,
        actor: &Actor,
        item_id: ItemId,
    ) -> Result<VerificationReport, RegisterError> {
        self.registry
            .authorize(actor.user_id, AuthorizationTier::required_for_read())
            .await?;

        let stored = self.ledger.current_state(item_id).await?;
        let mut replayer = Replayer::new(item_id);
        let mut entries_checked = 0u64;
        let mut page = PageRequest::new(1, self.settings.max_page_size.max(1));

        let violation = loop {
            let (entries, _) = self.ledger.list_by_item(item_id, page).await?;

            let mut failed = None;
            for entry in entries
                .iter()
                .take_while(|e| e.sequence_number <= stored.last_sequence_number)
            {
                if let Err(v) = replayer.push(entry) {
                    failed = Some(v);
                    break;
                }
                entries_checked += 1;
            }
            if failed.is_some() {
                break failed;
            }

            if entries.is_empty()
                || replayer.state().last_sequence_number >= stored.last_sequence_number
            {
                break IntegrityViolation::check_state(&stored, replayer.state()).err();
            }
            page = page.next();
        };

        if let Some(v) = &violation {
            tracing::warn!(item_id = %item_id, violation = %v, "Register integrity check failed");
        }

        Ok(VerificationReport {
            item_id,
            stored,
            entries_checked,
            violation,
        })
    }

    /// Grant an authorization. See [`AuthorizationRegistry::grant`].
    pub async fn grant_authorization(
        &self,
        actor: &Actor,
        user_id: UserId,
        user_name: &str,
        tier: AuthorizationTier,
    ) -> Result<AuthorizedPerson, RegisterError> {
        self.registry.grant(user_id, user_name, tier, actor).await
    }

    /// Revoke an authorization. See [`AuthorizationRegistry::revoke`].
    pub async fn revoke_authorization(
        &self,
        actor: &Actor,
        id: AuthorizationId,
    ) -> Result<AuthorizedPerson, RegisterError> {
        self.registry.revoke(id, actor).await
    }

    /// Active authorizations ordered by user name.
    pub async fn list_authorized_personnel(
        &self,
    ) -> Result<Vec<AuthorizedPerson>, RegisterError> {
        self.registry.list_active().await
    }
}
