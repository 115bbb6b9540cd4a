#![allow(dead_code)]

use plugin_account::{PluginAccount, PluginCatalog};
use plugin_account_types::{
    felt::CHAIN_ID_TESTNET, selector_from_name, Call, Felt, InvokeTransaction, PluginKind, Policy, SessionDomain,
};
use session_signer::{build_invoke, issue_session, DirectKeySigner, EcdsaKeyPair, IssuedSession, MockEnvironment, SessionKeySigner};

pub const ACCOUNT: u64 = 0xacc0_0001;
pub const SIGNER_PLUGIN: u64 = 0x5167;
pub const SESSION_PLUGIN: u64 = 0x5e55;
pub const DAPP1: u64 = 0xda01;
pub const DAPP2: u64 = 0xda02;
pub const NOW: u64 = 1_000;
pub const EXPIRES_AT: u64 = 2_000;

pub fn felt(v: u64) -> Felt {
    Felt::from(v)
}

pub fn selector(name: &str) -> Felt {
    selector_from_name(name)
}

pub fn call(to: u64, name: &str, args: &[u64]) -> Call {
    Call::new(felt(to), selector(name), args.iter().copied().map(felt).collect())
}

pub struct Fixture {
    pub account: PluginAccount,
    pub env: MockEnvironment,
    pub owner: EcdsaKeyPair,
    pub session_key: EcdsaKeyPair,
}

/// Initialized account with the session plugin installed and two demo dapps deployed.
pub fn setup() -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();

    let catalog = PluginCatalog::new()
        .with(felt(SIGNER_PLUGIN), PluginKind::StarkSigner)
        .with(felt(SESSION_PLUGIN), PluginKind::SessionKey);
    let owner = EcdsaKeyPair::from_secret(0x0123_4567).unwrap();
    let session_key = EcdsaKeyPair::from_secret(0x89ab_cdef).unwrap();

    let mut account = PluginAccount::new(felt(ACCOUNT), catalog);
    account.initialize(felt(SIGNER_PLUGIN), &[owner.public_key()]).unwrap();
    account.add_plugin(felt(ACCOUNT), felt(SESSION_PLUGIN), &[]).unwrap();

    let env = MockEnvironment::new(NOW, CHAIN_ID_TESTNET)
        .with_dapp(felt(DAPP1))
        .with_dapp(felt(DAPP2));

    Fixture {
        account,
        env,
        owner,
        session_key,
    }
}

impl Fixture {
    pub fn domain(&self) -> SessionDomain {
        SessionDomain::new(CHAIN_ID_TESTNET, felt(ACCOUNT))
    }

    pub fn issue(&self, policies: &[(u64, &str)]) -> IssuedSession {
        let policies = policies
            .iter()
            .map(|(to, name)| Policy::new(felt(*to), selector(name)))
            .collect();
        issue_session(&self.owner, &self.domain(), self.session_key.public_key(), EXPIRES_AT, policies).unwrap()
    }

    pub fn owner_tx(&self, calls: &[Call]) -> InvokeTransaction {
        let signer = DirectKeySigner::new(felt(SIGNER_PLUGIN), self.owner.clone());
        build_invoke(&signer, felt(ACCOUNT), calls, self.account.nonce(), Felt::ZERO, CHAIN_ID_TESTNET).unwrap()
    }

    pub fn session_tx(&self, session: &IssuedSession, calls: &[Call]) -> InvokeTransaction {
        let signer = SessionKeySigner::new(felt(SESSION_PLUGIN), self.session_key.clone(), session.clone());
        build_invoke(&signer, felt(ACCOUNT), calls, self.account.nonce(), Felt::ZERO, CHAIN_ID_TESTNET).unwrap()
    }
}
