//! Mock ledger for off-chain testing.
//!
//! Hosts any number of demo dapps, each keeping one balance per caller.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use plugin_account_types::{selector_from_name, Call, Environment, EnvironmentError, Felt};

pub const SET_BALANCE: &str = "set_balance";
pub const SET_BALANCE_DOUBLE: &str = "set_balance_double";
pub const SET_BALANCE_TIMES3: &str = "set_balance_times3";
pub const GET_BALANCE: &str = "get_balance";

#[derive(Clone, Debug)]
pub struct MockEnvironment {
    pub block_timestamp: u64,
    pub chain_id: Felt,
    dapps: BTreeSet<Felt>,
    /// `(dapp, user) -> balance`.
    balances: BTreeMap<(Felt, Felt), Felt>,
    /// Every forwarded call, with its caller.
    pub calls: Vec<(Felt, Call)>,
    /// Balances and call-log length saved by `snapshot`, innermost last.
    snapshots: Vec<(BTreeMap<(Felt, Felt), Felt>, usize)>,
}

impl MockEnvironment {
    pub fn new(block_timestamp: u64, chain_id: Felt) -> Self {
        Self {
            block_timestamp,
            chain_id,
            dapps: BTreeSet::new(),
            balances: BTreeMap::new(),
            calls: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    pub fn with_dapp(mut self, address: Felt) -> Self {
        self.deploy_dapp(address);
        self
    }

    pub fn deploy_dapp(&mut self, address: Felt) {
        self.dapps.insert(address);
    }

    pub fn balance_of(&self, dapp: Felt, user: Felt) -> Felt {
        self.balances.get(&(dapp, user)).copied().unwrap_or_default()
    }

    fn set(&mut self, dapp: Felt, user: Felt, args: &[Felt], factor: u64) -> Result<Vec<Felt>, EnvironmentError> {
        let [value] = args else {
            return Err(EnvironmentError::Reverted("expected one argument".into()));
        };
        let balance = value
            .checked_mul(Felt::from(factor))
            .ok_or_else(|| EnvironmentError::Reverted("balance overflow".into()))?;
        self.balances.insert((dapp, user), balance);
        Ok(Vec::new())
    }
}

impl Environment for MockEnvironment {
    fn block_timestamp(&self) -> u64 {
        self.block_timestamp
    }

    fn chain_id(&self) -> Felt {
        self.chain_id
    }

    fn snapshot(&mut self) -> usize {
        self.snapshots.push((self.balances.clone(), self.calls.len()));
        self.snapshots.len() - 1
    }

    fn revert(&mut self, id: usize) {
        if id >= self.snapshots.len() {
            return;
        }
        let (balances, calls_len) = self.snapshots.split_off(id).swap_remove(0);
        self.balances = balances;
        self.calls.truncate(calls_len);
        debug!("reverted to snapshot {id}");
    }

    fn commit(&mut self, id: usize) {
        self.snapshots.truncate(id);
    }

    fn call_contract(&mut self, caller: Felt, call: &Call) -> Result<Vec<Felt>, EnvironmentError> {
        if !self.dapps.contains(&call.to) {
            return Err(EnvironmentError::ContractNotFound(call.to));
        }
        debug!("dapp call {:#x} from {caller:#x}", call.selector);
        self.calls.push((caller, call.clone()));

        let (dapp, selector) = (call.to, call.selector);
        if selector == selector_from_name(SET_BALANCE) {
            self.set(dapp, caller, &call.calldata, 1)
        } else if selector == selector_from_name(SET_BALANCE_DOUBLE) {
            self.set(dapp, caller, &call.calldata, 2)
        } else if selector == selector_from_name(SET_BALANCE_TIMES3) {
            self.set(dapp, caller, &call.calldata, 3)
        } else if selector == selector_from_name(GET_BALANCE) {
            let [user] = call.calldata.as_slice() else {
                return Err(EnvironmentError::Reverted("expected one argument".into()));
            };
            Ok(vec![self.balance_of(dapp, *user)])
        } else {
            Err(EnvironmentError::EntryPointNotFound {
                contract: dapp,
                selector,
            })
        }
    }
}
