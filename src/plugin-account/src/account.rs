//! The plugin account.
//!
//! Owns the nonce, the installed plugins, the owner key and the revoked-session set. Every
//! transaction is routed through the plugin named by the first signature felt; the account then
//! runs the calls in order, dispatching calls addressed to itself to its own entry points.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use plugin_account_types::{
    selector_from_name, Call, Environment, Felt, InvokeTransaction, PluginKind, SignaturePayload,
};

use crate::{
    constants::{
        ACCOUNT_INTERFACE_ID, ACCOUNT_NAME, ACCOUNT_VERSION, ADD_PLUGIN, ERC165_INTERFACE_ID, EXECUTE_ON_PLUGIN,
        GET_PUBLIC_KEY, IS_SESSION_REVOKED, REMOVE_PLUGIN, REVOKE_SESSION, SET_PUBLIC_KEY,
    },
    decoder::{decode_execute_calldata, decode_signature},
    errors::AccountError,
    plugins::{
        session_key::{self, SessionContext},
        stark_signer, PluginCatalog,
    },
    utils::felts,
};

/// Records emitted by state changes and executed transactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountEvent {
    TransactionExecuted { hash: Felt, response_len: usize },
    PluginAdded(Felt),
    PluginRemoved(Felt),
    OwnerKeyChanged { old_key: Felt, new_key: Felt },
    SessionRevoked(Felt),
}

/// Outcome of a successful `execute`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionReceipt {
    pub transaction_hash: Felt,
    /// Nonce the transaction consumed.
    pub nonce: Felt,
    /// Return data of each call, in call order.
    pub results: Vec<Vec<Felt>>,
    pub events: Vec<AccountEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountState {
    pub address: Felt,
    pub nonce: Felt,
    pub plugins: BTreeMap<Felt, PluginKind>,
    pub default_plugin: Option<Felt>,
    pub owner_key: Felt,
    pub revoked_sessions: BTreeSet<Felt>,
}

impl AccountState {
    fn only_self(&self, caller: Felt) -> Result<(), AccountError> {
        if caller != self.address {
            warn!("rejected restricted call from {caller:#x} on account {:#x}", self.address);
            return Err(AccountError::Unauthorized { caller });
        }
        Ok(())
    }

    fn install(&mut self, catalog: &PluginCatalog, id: Felt, calldata: &[Felt]) -> Result<Vec<AccountEvent>, AccountError> {
        let kind = catalog.kind_of(id).ok_or(AccountError::UnknownPlugin(id))?;
        let mut events = Vec::new();
        match kind {
            PluginKind::StarkSigner => {
                if let Some(key) = stark_signer::parse_init(calldata)? {
                    events.push(self.change_owner_key(key));
                }
            },
            PluginKind::SessionKey => {
                if !calldata.is_empty() {
                    return Err(AccountError::MalformedCall { index: 0, reason: "unexpected plugin calldata" });
                }
            },
        }
        self.plugins.insert(id, kind);
        events.insert(0, AccountEvent::PluginAdded(id));
        Ok(events)
    }

    fn uninstall(&mut self, id: Felt) -> Result<AccountEvent, AccountError> {
        if self.default_plugin == Some(id) {
            return Err(AccountError::DefaultPluginRemoval(id));
        }
        if self.plugins.remove(&id).is_none() {
            return Err(AccountError::UnknownPlugin(id));
        }
        Ok(AccountEvent::PluginRemoved(id))
    }

    fn change_owner_key(&mut self, new_key: Felt) -> AccountEvent {
        let old_key = std::mem::replace(&mut self.owner_key, new_key);
        AccountEvent::OwnerKeyChanged { old_key, new_key }
    }

    fn set_owner_key(&mut self, key: Felt) -> Result<AccountEvent, AccountError> {
        if key == Felt::ZERO {
            return Err(AccountError::MalformedCall { index: 0, reason: "zero owner key" });
        }
        Ok(self.change_owner_key(key))
    }

    fn revoke(&mut self, session_hash: Felt) -> AccountEvent {
        if !self.revoked_sessions.insert(session_hash) {
            debug!("session {session_hash:#x} already revoked");
        }
        AccountEvent::SessionRevoked(session_hash)
    }

    fn plugin_kind(&self, id: Felt) -> Result<PluginKind, AccountError> {
        self.plugins.get(&id).copied().ok_or(AccountError::UnknownPlugin(id))
    }

    fn has_session_plugin(&self) -> bool {
        self.plugins.values().any(|kind| *kind == PluginKind::SessionKey)
    }
}

/// A single account instance and the plugin classes it may install.
#[derive(Clone, Debug)]
pub struct PluginAccount {
    state: AccountState,
    catalog: PluginCatalog,
}

impl PluginAccount {
    pub fn new(address: Felt, catalog: PluginCatalog) -> Self {
        Self {
            state: AccountState {
                address,
                ..AccountState::default()
            },
            catalog,
        }
    }

    /// Install the signer plugin as the default. Allowed once.
    pub fn initialize(&mut self, signer_plugin: Felt, plugin_calldata: &[Felt]) -> Result<(), AccountError> {
        if self.state.default_plugin.is_some() {
            return Err(AccountError::AlreadyInitialized);
        }
        if self.catalog.kind_of(signer_plugin) != Some(PluginKind::StarkSigner) {
            return Err(AccountError::UnknownPlugin(signer_plugin));
        }
        if stark_signer::parse_init(plugin_calldata)?.is_none() {
            return Err(AccountError::MalformedCall { index: 0, reason: "missing owner key" });
        }

        let mut state = self.state.clone();
        state.install(&self.catalog, signer_plugin, plugin_calldata)?;
        state.default_plugin = Some(signer_plugin);
        self.state = state;
        info!(
            "account {:#x} initialized with signer plugin {signer_plugin:#x}",
            self.state.address
        );
        Ok(())
    }

    pub fn state(&self) -> &AccountState {
        &self.state
    }

    pub fn address(&self) -> Felt {
        self.state.address
    }

    pub fn nonce(&self) -> Felt {
        self.state.nonce
    }

    pub fn owner_key(&self) -> Felt {
        self.state.owner_key
    }

    pub fn is_plugin(&self, id: Felt) -> bool {
        self.state.plugins.contains_key(&id)
    }

    pub fn default_plugin(&self) -> Result<Felt, AccountError> {
        self.state.default_plugin.ok_or(AccountError::NotInitialized)
    }

    pub fn is_session_revoked(&self, session_hash: Felt) -> bool {
        self.state.revoked_sessions.contains(&session_hash)
    }

    pub fn name(&self) -> Felt {
        ACCOUNT_NAME
    }

    pub fn version(&self) -> Felt {
        ACCOUNT_VERSION
    }

    pub fn supports_interface(&self, interface_id: Felt) -> bool {
        interface_id == ERC165_INTERFACE_ID || interface_id == ACCOUNT_INTERFACE_ID
    }

    pub fn add_plugin(&mut self, caller: Felt, id: Felt, calldata: &[Felt]) -> Result<Vec<AccountEvent>, AccountError> {
        self.state.only_self(caller)?;
        let mut state = self.state.clone();
        let events = state.install(&self.catalog, id, calldata)?;
        self.state = state;
        Ok(events)
    }

    pub fn remove_plugin(&mut self, caller: Felt, id: Felt) -> Result<AccountEvent, AccountError> {
        self.state.only_self(caller)?;
        self.state.uninstall(id)
    }

    pub fn set_owner_key(&mut self, caller: Felt, key: Felt) -> Result<AccountEvent, AccountError> {
        self.state.only_self(caller)?;
        self.state.set_owner_key(key)
    }

    pub fn revoke_session(&mut self, caller: Felt, session_hash: Felt) -> Result<AccountEvent, AccountError> {
        self.state.only_self(caller)?;
        if !self.state.has_session_plugin() {
            return Err(AccountError::UnknownSelector(selector_from_name(REVOKE_SESSION)));
        }
        Ok(self.state.revoke(session_hash))
    }

    /// View entry points of installed plugins.
    pub fn read_on_plugin(&self, plugin: Felt, selector: Felt, args: &[Felt]) -> Result<Vec<Felt>, AccountError> {
        match self.state.plugin_kind(plugin)? {
            PluginKind::StarkSigner if selector == selector_from_name(GET_PUBLIC_KEY) => Ok(vec![self.state.owner_key]),
            PluginKind::SessionKey if selector == selector_from_name(IS_SESSION_REVOKED) => {
                let [session_hash] = args else {
                    return Err(AccountError::MalformedCall { index: 0, reason: "expected one argument" });
                };
                Ok(vec![Felt::from(self.is_session_revoked(*session_hash) as u64)])
            },
            _ => Err(AccountError::UnknownSelector(selector)),
        }
    }

    /// Check a transaction without changing state; returns its hash.
    pub fn validate<E: Environment>(&self, tx: &InvokeTransaction, env: &E) -> Result<Felt, AccountError> {
        self.validated_calls(tx, env).map(|(hash, _)| hash)
    }

    fn validated_calls<E: Environment>(&self, tx: &InvokeTransaction, env: &E) -> Result<(Felt, Vec<Call>), AccountError> {
        let state = &self.state;
        if state.default_plugin.is_none() {
            return Err(AccountError::NotInitialized);
        }
        if tx.sender != state.address {
            return Err(AccountError::WrongSender {
                expected: state.address,
                actual: tx.sender,
            });
        }
        if tx.nonce != state.nonce {
            return Err(AccountError::InvalidNonce {
                expected: state.nonce,
                actual: tx.nonce,
            });
        }

        let calls = decode_execute_calldata(&tx.calldata)?;
        let envelope = decode_signature(&tx.signature, |id| state.plugins.get(&id).copied())?;
        let chain_id = env.chain_id();
        let transaction_hash = tx.hash(chain_id);

        match &envelope.payload {
            SignaturePayload::DirectKey(signature) => {
                stark_signer::validate(state.owner_key, transaction_hash, signature)?;
            },
            SignaturePayload::Session(payload) => {
                let is_revoked = |hash: Felt| state.revoked_sessions.contains(&hash);
                let ctx = SessionContext {
                    account: state.address,
                    chain_id,
                    owner_key: state.owner_key,
                    now: env.block_timestamp(),
                    transaction_hash,
                    is_revoked: &is_revoked,
                };
                session_key::validate(&ctx, &calls, payload)?;
                // Session keys never manage the account.
                if calls.iter().any(|call| call.to == state.address) {
                    return Err(AccountError::Unauthorized { caller: payload.session_key });
                }
            },
        }

        debug!(
            "tx {transaction_hash:#x} validated by plugin {:#x} ({} call(s))",
            envelope.plugin_id,
            calls.len()
        );
        Ok((transaction_hash, calls))
    }

    /// Validate, consume the nonce and run the calls.
    ///
    /// Account state and external calls are committed only when every call succeeds; otherwise
    /// the environment is reverted to its state before the first call. The nonce stays consumed
    /// once validation has passed.
    pub fn execute<E: Environment>(&mut self, tx: &InvokeTransaction, env: &mut E) -> Result<ExecutionReceipt, AccountError> {
        let (transaction_hash, calls) = self.validated_calls(tx, &*env)?;
        let nonce = self.state.nonce;
        self.state.nonce = nonce.saturating_add(Felt::from(1u64));

        let mut staged = self.state.clone();
        let snapshot = env.snapshot();
        let mut events = Vec::new();
        let mut results = Vec::with_capacity(calls.len());
        for (index, call) in calls.iter().enumerate() {
            let result = if call.to == staged.address {
                call_self(&mut staged, &self.catalog, index, call, &mut events)
            } else {
                env.call_contract(staged.address, call)
                    .map_err(|reason| AccountError::CallFailed { call: index, reason })
            };
            match result {
                Ok(data) => results.push(data),
                Err(err) => {
                    warn!("tx {transaction_hash:#x} call #{index} failed: {err}");
                    env.revert(snapshot);
                    return Err(err);
                },
            }
        }
        env.commit(snapshot);
        self.state = staged;

        let response_len = results.iter().map(Vec::len).sum();
        events.push(AccountEvent::TransactionExecuted {
            hash: transaction_hash,
            response_len,
        });
        info!("executed tx {transaction_hash:#x} with nonce {nonce}");
        Ok(ExecutionReceipt {
            transaction_hash,
            nonce,
            results,
            events,
        })
    }
}

/// Dispatch a call addressed to the account itself.
fn call_self(
    state: &mut AccountState,
    catalog: &PluginCatalog,
    index: usize,
    call: &Call,
    events: &mut Vec<AccountEvent>,
) -> Result<Vec<Felt>, AccountError> {
    let malformed = |reason: &'static str| AccountError::MalformedCall { index, reason };
    let args = &call.calldata;
    let mut i = 0usize;

    if call.selector == selector_from_name(ADD_PLUGIN) {
        let plugin = felts::read_felt(args, &mut i).map_err(|_| malformed("missing plugin id"))?;
        let plugin_args = felts::read_array(args, &mut i).map_err(|_| malformed("plugin calldata out of bounds"))?;
        if i != args.len() {
            return Err(malformed("trailing calldata"));
        }
        events.extend(state.install(catalog, plugin, &plugin_args)?);
        return Ok(Vec::new());
    }

    if call.selector == selector_from_name(REMOVE_PLUGIN) {
        let [plugin] = args.as_slice() else {
            return Err(malformed("expected one argument"));
        };
        events.push(state.uninstall(*plugin)?);
        return Ok(Vec::new());
    }

    if call.selector == selector_from_name(EXECUTE_ON_PLUGIN) {
        let plugin = felts::read_felt(args, &mut i).map_err(|_| malformed("missing plugin id"))?;
        let selector = felts::read_felt(args, &mut i).map_err(|_| malformed("missing plugin selector"))?;
        let plugin_args = felts::read_array(args, &mut i).map_err(|_| malformed("plugin calldata out of bounds"))?;
        if i != args.len() {
            return Err(malformed("trailing calldata"));
        }

        let event = match state.plugin_kind(plugin)? {
            PluginKind::StarkSigner if selector == selector_from_name(SET_PUBLIC_KEY) => {
                let [key] = plugin_args.as_slice() else {
                    return Err(malformed("expected one plugin argument"));
                };
                state.set_owner_key(*key)?
            },
            PluginKind::SessionKey if selector == selector_from_name(REVOKE_SESSION) => {
                let [session_hash] = plugin_args.as_slice() else {
                    return Err(malformed("expected one plugin argument"));
                };
                state.revoke(*session_hash)
            },
            _ => return Err(AccountError::UnknownSelector(selector)),
        };
        events.push(event);
        return Ok(Vec::new());
    }

    Err(AccountError::UnknownSelector(call.selector))
}
