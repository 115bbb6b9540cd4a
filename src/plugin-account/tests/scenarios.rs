mod common;

use common::*;
use plugin_account::{AccountError, AccountEvent, EnvironmentError, SignatureRole};
use plugin_account_types::{felt::CHAIN_ID_TESTNET, Call, Environment, Felt, InvokeTransaction};
use session_signer::{encode_signature, EcdsaKeyPair, PluginSigner, SessionKeySigner};

fn execute_on_plugin(plugin: u64, entry_point: &str, args: &[Felt]) -> Call {
    let mut calldata = vec![felt(plugin), selector(entry_point), Felt::from(args.len())];
    calldata.extend_from_slice(args);
    Call::new(felt(ACCOUNT), selector("executeOnPlugin"), calldata)
}

#[test]
fn owner_signed_batch_executes_and_bumps_nonce() {
    let mut f = setup();
    let calls = vec![call(DAPP1, "set_balance", &[5]), call(DAPP2, "set_balance_double", &[7])];
    let tx = f.owner_tx(&calls);

    let hash = f.account.validate(&tx, &f.env).unwrap();
    let receipt = f.account.execute(&tx, &mut f.env).unwrap();

    assert_eq!(receipt.transaction_hash, hash);
    assert_eq!(receipt.nonce, Felt::ZERO);
    assert_eq!(f.account.nonce(), felt(1));
    assert_eq!(f.env.balance_of(felt(DAPP1), felt(ACCOUNT)), felt(5));
    assert_eq!(f.env.balance_of(felt(DAPP2), felt(ACCOUNT)), felt(14));
    assert_eq!(receipt.results, vec![Vec::<Felt>::new(), Vec::new()]);
    assert_eq!(receipt.events, vec![AccountEvent::TransactionExecuted { hash, response_len: 0 }]);

    // Replaying the same transaction hits the consumed nonce.
    assert_eq!(
        f.account.execute(&tx, &mut f.env),
        Err(AccountError::InvalidNonce { expected: felt(1), actual: Felt::ZERO })
    );
}

#[test]
fn session_batch_within_policies() {
    let mut f = setup();
    let session = f.issue(&[(DAPP1, "set_balance"), (DAPP2, "set_balance_times3")]);
    let calls = vec![call(DAPP1, "set_balance", &[4]), call(DAPP2, "set_balance_times3", &[4])];
    let tx = f.session_tx(&session, &calls);

    f.account.execute(&tx, &mut f.env).unwrap();
    assert_eq!(f.env.balance_of(felt(DAPP1), felt(ACCOUNT)), felt(4));
    assert_eq!(f.env.balance_of(felt(DAPP2), felt(ACCOUNT)), felt(12));
    assert_eq!(f.account.nonce(), felt(1));
}

#[test]
fn session_call_outside_policies_is_rejected() {
    let mut f = setup();
    let session = f.issue(&[(DAPP1, "set_balance"), (DAPP2, "set_balance_times3")]);

    // Borrow the proof of an authorized call for one that is not in the tree.
    let allowed = vec![call(DAPP1, "set_balance", &[1])];
    let forbidden = vec![call(DAPP1, "set_balance_times3", &[1])];
    let mut tx = f.session_tx(&session, &allowed);
    tx.calldata = plugin_account_types::encode_execute_calldata(&forbidden).unwrap();
    let signer = SessionKeySigner::new(felt(SESSION_PLUGIN), f.session_key.clone(), session);
    let envelope = signer.sign_envelope(tx.hash(CHAIN_ID_TESTNET), &allowed).unwrap();
    tx.signature = encode_signature(&envelope);

    assert_eq!(f.account.execute(&tx, &mut f.env), Err(AccountError::PolicyNotAuthorized { call: 0 }));
    assert_eq!(f.account.nonce(), Felt::ZERO);
    assert_eq!(f.env.balance_of(felt(DAPP1), felt(ACCOUNT)), Felt::ZERO);
}

#[test]
fn truncated_session_signature_is_a_length_error() {
    let f = setup();
    let session = f.issue(&[(DAPP1, "set_balance")]);
    let mut tx = f.session_tx(&session, &[call(DAPP1, "set_balance", &[1])]);
    f.account.validate(&tx, &f.env).unwrap();

    tx.signature.pop();
    assert!(matches!(f.account.validate(&tx, &f.env), Err(AccountError::EnvelopeLength { .. })));
}

#[test]
fn extra_signature_felt_is_a_length_error() {
    let f = setup();
    let mut tx = f.owner_tx(&[call(DAPP1, "set_balance", &[1])]);
    tx.signature.push(Felt::ZERO);
    assert!(matches!(f.account.validate(&tx, &f.env), Err(AccountError::EnvelopeLength { .. })));
}

#[test]
fn revoked_session_is_rejected() {
    let mut f = setup();
    let session = f.issue(&[(DAPP1, "set_balance")]);
    let tx = f.session_tx(&session, &[call(DAPP1, "set_balance", &[1])]);
    f.account.validate(&tx, &f.env).unwrap();

    let hash = session.token.session_hash;
    f.account.revoke_session(felt(ACCOUNT), hash).unwrap();
    assert!(f.account.is_session_revoked(hash));
    assert_eq!(f.account.execute(&tx, &mut f.env), Err(AccountError::SessionRevoked(hash)));
    assert_eq!(f.account.nonce(), Felt::ZERO);
}

#[test]
fn expiry_is_reported_before_revocation() {
    let mut f = setup();
    let session = f.issue(&[(DAPP1, "set_balance")]);
    let hash = session.token.session_hash;
    f.account.revoke_session(felt(ACCOUNT), hash).unwrap();

    let tx = f.session_tx(&session, &[call(DAPP1, "set_balance", &[1])]);
    f.env.block_timestamp = EXPIRES_AT;
    assert_eq!(
        f.account.validate(&tx, &f.env),
        Err(AccountError::SessionExpired { expires_at: EXPIRES_AT, now: EXPIRES_AT })
    );
}

#[test]
fn revocation_through_owner_transaction() {
    let mut f = setup();
    let session = f.issue(&[(DAPP1, "set_balance")]);
    let hash = session.token.session_hash;

    let revoke = f.owner_tx(&[execute_on_plugin(SESSION_PLUGIN, "revokeSession", &[hash])]);
    let receipt = f.account.execute(&revoke, &mut f.env).unwrap();
    assert_eq!(receipt.events[0], AccountEvent::SessionRevoked(hash));
    assert_eq!(
        f.account.read_on_plugin(felt(SESSION_PLUGIN), selector("isSessionRevoked"), &[hash]),
        Ok(vec![felt(1)])
    );

    let tx = f.session_tx(&session, &[call(DAPP1, "set_balance", &[1])]);
    assert_eq!(f.account.validate(&tx, &f.env), Err(AccountError::SessionRevoked(hash)));
}

#[test]
fn revocation_is_idempotent() {
    let mut f = setup();
    let hash = felt(0xfeed);
    assert_eq!(f.account.revoke_session(felt(ACCOUNT), hash), Ok(AccountEvent::SessionRevoked(hash)));
    assert_eq!(f.account.revoke_session(felt(ACCOUNT), hash), Ok(AccountEvent::SessionRevoked(hash)));
    assert!(f.account.is_session_revoked(hash));
    assert!(!f.account.is_session_revoked(felt(0xbeef)));
}

#[test]
fn expired_session_is_rejected() {
    let mut f = setup();
    let session = f.issue(&[(DAPP1, "set_balance")]);
    let tx = f.session_tx(&session, &[call(DAPP1, "set_balance", &[1])]);

    f.env.block_timestamp = EXPIRES_AT - 1;
    f.account.validate(&tx, &f.env).unwrap();

    f.env.block_timestamp = EXPIRES_AT;
    assert_eq!(
        f.account.execute(&tx, &mut f.env),
        Err(AccountError::SessionExpired { expires_at: EXPIRES_AT, now: EXPIRES_AT })
    );
}

#[test]
fn owner_rotation_invalidates_session_tokens() {
    let mut f = setup();
    let session = f.issue(&[(DAPP1, "set_balance")]);
    let new_owner = EcdsaKeyPair::from_secret(0x4242).unwrap();
    let old_key = f.owner.public_key();

    let rotate = f.owner_tx(&[execute_on_plugin(SIGNER_PLUGIN, "setPublicKey", &[new_owner.public_key()])]);
    let receipt = f.account.execute(&rotate, &mut f.env).unwrap();
    assert_eq!(receipt.events[0], AccountEvent::OwnerKeyChanged {
        old_key,
        new_key: new_owner.public_key(),
    });
    assert_eq!(f.account.owner_key(), new_owner.public_key());
    assert_eq!(
        f.account.read_on_plugin(felt(SIGNER_PLUGIN), selector("getPublicKey"), &[]),
        Ok(vec![new_owner.public_key()])
    );

    let tx = f.session_tx(&session, &[call(DAPP1, "set_balance", &[1])]);
    assert_eq!(f.account.validate(&tx, &f.env), Err(AccountError::BadSignature(SignatureRole::SessionToken)));

    let tx = f.owner_tx(&[call(DAPP1, "set_balance", &[1])]);
    assert_eq!(f.account.validate(&tx, &f.env), Err(AccountError::BadSignature(SignatureRole::Owner)));

    f.owner = new_owner;
    let tx = f.owner_tx(&[call(DAPP1, "set_balance", &[1])]);
    f.account.execute(&tx, &mut f.env).unwrap();
}

#[test]
fn foreign_session_key_signature_is_rejected() {
    let f = setup();
    let session = f.issue(&[(DAPP1, "set_balance")]);
    let impostor = EcdsaKeyPair::from_secret(0x666).unwrap();
    let signer = SessionKeySigner::new(felt(SESSION_PLUGIN), impostor, session);
    let tx = session_signer::build_invoke(
        &signer,
        felt(ACCOUNT),
        &[call(DAPP1, "set_balance", &[1])],
        Felt::ZERO,
        Felt::ZERO,
        CHAIN_ID_TESTNET,
    )
    .unwrap();
    assert_eq!(f.account.validate(&tx, &f.env), Err(AccountError::BadSignature(SignatureRole::SessionKey)));
}

#[test]
fn declared_depth_must_match_every_proof() {
    let f = setup();
    let session = f.issue(&[(DAPP1, "set_balance"), (DAPP2, "set_balance")]);
    let mut tx = f.session_tx(&session, &[call(DAPP1, "set_balance", &[1])]);
    // [plugin, key, expires, r, s, root, proof_len, ...]
    tx.signature[6] = felt(3);
    assert_eq!(
        f.account.validate(&tx, &f.env),
        Err(AccountError::ProofLengthMismatch { call: 0, expected: 3, actual: 1 })
    );
}

#[test]
fn session_key_cannot_manage_the_account() {
    let f = setup();
    let session = f.issue(&[(ACCOUNT, "addPlugin"), (DAPP1, "set_balance")]);
    let tx = f.session_tx(&session, &[call(ACCOUNT, "addPlugin", &[SESSION_PLUGIN, 0])]);
    assert_eq!(
        f.account.validate(&tx, &f.env),
        Err(AccountError::Unauthorized { caller: f.session_key.public_key() })
    );
}

#[test]
fn unknown_plugin_in_signature() {
    let f = setup();
    let mut tx = f.owner_tx(&[call(DAPP1, "set_balance", &[1])]);
    tx.signature[0] = felt(0x999);
    assert_eq!(f.account.validate(&tx, &f.env), Err(AccountError::UnknownPlugin(felt(0x999))));
}

#[test]
fn failed_call_reverts_earlier_dapp_calls() {
    let mut f = setup();
    f.env.call_contract(felt(ACCOUNT), &call(DAPP2, "set_balance", &[9])).unwrap();

    let calls = vec![
        call(DAPP1, "set_balance", &[5]),
        call(DAPP2, "set_balance_double", &[5]),
        call(0x777, "set_balance", &[1]),
    ];
    let tx = f.owner_tx(&calls);
    assert_eq!(
        f.account.execute(&tx, &mut f.env),
        Err(AccountError::CallFailed { call: 2, reason: EnvironmentError::ContractNotFound(felt(0x777)) })
    );
    assert_eq!(f.env.balance_of(felt(DAPP1), felt(ACCOUNT)), Felt::ZERO);
    assert_eq!(f.env.balance_of(felt(DAPP2), felt(ACCOUNT)), felt(9));
    assert_eq!(f.env.calls.len(), 1);

    let tx = f.owner_tx(&calls[..2]);
    f.account.execute(&tx, &mut f.env).unwrap();
    assert_eq!(f.env.balance_of(felt(DAPP1), felt(ACCOUNT)), felt(5));
    assert_eq!(f.env.balance_of(felt(DAPP2), felt(ACCOUNT)), felt(10));
}

#[test]
fn oversized_call_count_is_a_length_error() {
    let f = setup();
    let session = f.issue(&[(DAPP1, "set_balance")]);
    for shift in [62usize, 63, 64, 200] {
        let mut tx = f.session_tx(&session, &[call(DAPP1, "set_balance", &[1])]);
        // [plugin, key, expires, r, s, root, proof_len, calls_len, ...]
        tx.signature[7] = Felt::from(1u64) << shift;
        assert!(
            matches!(f.account.validate(&tx, &f.env), Err(AccountError::EnvelopeLength { .. })),
            "calls_len = 2^{shift}"
        );
    }
}

#[test]
fn failed_call_rolls_back_account_changes() {
    let mut f = setup();
    let calls = vec![
        Call::new(felt(ACCOUNT), selector("removePlugin"), vec![felt(SESSION_PLUGIN)]),
        call(0x777, "set_balance", &[1]),
    ];
    let tx = f.owner_tx(&calls);
    assert_eq!(
        f.account.execute(&tx, &mut f.env),
        Err(AccountError::CallFailed { call: 1, reason: EnvironmentError::ContractNotFound(felt(0x777)) })
    );
    assert!(f.account.is_plugin(felt(SESSION_PLUGIN)));
    // Validation passed, so the nonce is spent.
    assert_eq!(f.account.nonce(), felt(1));

    let tx = f.owner_tx(&calls[..1]);
    let receipt = f.account.execute(&tx, &mut f.env).unwrap();
    assert_eq!(receipt.events[0], AccountEvent::PluginRemoved(felt(SESSION_PLUGIN)));
    assert!(!f.account.is_plugin(felt(SESSION_PLUGIN)));
}

#[test]
fn plugins_are_managed_through_self_calls() {
    let mut f = setup();
    let remove = f.owner_tx(&[Call::new(felt(ACCOUNT), selector("removePlugin"), vec![felt(SESSION_PLUGIN)])]);
    f.account.execute(&remove, &mut f.env).unwrap();

    let add = f.owner_tx(&[call(ACCOUNT, "addPlugin", &[SESSION_PLUGIN, 0])]);
    let receipt = f.account.execute(&add, &mut f.env).unwrap();
    assert_eq!(receipt.events[0], AccountEvent::PluginAdded(felt(SESSION_PLUGIN)));
    assert!(f.account.is_plugin(felt(SESSION_PLUGIN)));

    let remove_default = f.owner_tx(&[call(ACCOUNT, "removePlugin", &[SIGNER_PLUGIN])]);
    assert_eq!(
        f.account.execute(&remove_default, &mut f.env),
        Err(AccountError::DefaultPluginRemoval(felt(SIGNER_PLUGIN)))
    );

    let unknown = f.owner_tx(&[call(ACCOUNT, "upgrade", &[1])]);
    assert_eq!(f.account.execute(&unknown, &mut f.env), Err(AccountError::UnknownSelector(selector("upgrade"))));
}

#[test]
fn restricted_operations_require_the_account() {
    let mut f = setup();
    let stranger = felt(0x5757);
    assert_eq!(
        f.account.add_plugin(stranger, felt(SESSION_PLUGIN), &[]),
        Err(AccountError::Unauthorized { caller: stranger })
    );
    assert_eq!(f.account.remove_plugin(stranger, felt(SESSION_PLUGIN)), Err(AccountError::Unauthorized { caller: stranger }));
    assert_eq!(f.account.set_owner_key(stranger, felt(1)), Err(AccountError::Unauthorized { caller: stranger }));
    assert_eq!(f.account.revoke_session(stranger, felt(1)), Err(AccountError::Unauthorized { caller: stranger }));

    assert_eq!(
        f.account.remove_plugin(felt(ACCOUNT), felt(SIGNER_PLUGIN)),
        Err(AccountError::DefaultPluginRemoval(felt(SIGNER_PLUGIN)))
    );
    assert_eq!(
        f.account.add_plugin(felt(ACCOUNT), felt(0x1234), &[]),
        Err(AccountError::UnknownPlugin(felt(0x1234)))
    );
    assert_eq!(
        f.account.initialize(felt(SIGNER_PLUGIN), &[f.owner.public_key()]),
        Err(AccountError::AlreadyInitialized)
    );
}

#[test]
fn transaction_must_target_this_account_at_its_nonce() {
    let f = setup();
    let mut tx: InvokeTransaction = f.owner_tx(&[call(DAPP1, "set_balance", &[1])]);
    tx.nonce = felt(7);
    assert_eq!(
        f.account.validate(&tx, &f.env),
        Err(AccountError::InvalidNonce { expected: Felt::ZERO, actual: felt(7) })
    );

    tx.nonce = Felt::ZERO;
    tx.sender = felt(0xbad);
    assert_eq!(
        f.account.validate(&tx, &f.env),
        Err(AccountError::WrongSender { expected: felt(ACCOUNT), actual: felt(0xbad) })
    );
}

#[test]
fn introspection() {
    let f = setup();
    assert_eq!(f.account.name(), plugin_account_types::short_string("PluginAccount").unwrap());
    assert_eq!(f.account.version(), plugin_account_types::short_string("0.0.1").unwrap());
    assert!(f.account.supports_interface(felt(0x01ff_c9a7)));
    assert!(f.account.supports_interface(felt(0xa66b_d575)));
    assert!(!f.account.supports_interface(felt(0xffff_ffff)));
    assert_eq!(f.account.default_plugin(), Ok(felt(SIGNER_PLUGIN)));
    assert!(f.account.is_plugin(felt(SIGNER_PLUGIN)));
    assert_eq!(
        f.account.read_on_plugin(felt(SESSION_PLUGIN), selector("getPublicKey"), &[]),
        Err(AccountError::UnknownSelector(selector("getPublicKey")))
    );
}
