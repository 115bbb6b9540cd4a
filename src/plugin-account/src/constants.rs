//! Account identity and the entry points the account answers on itself.

use plugin_account_types::Felt;

/// `short_string("PluginAccount")`.
pub const ACCOUNT_NAME: Felt = Felt::from_limbs([0x6e41_6363_6f75_6e74, 0x50_6c75_6769, 0, 0]);

/// `short_string("0.0.1")`.
pub const ACCOUNT_VERSION: Felt = Felt::from_limbs([0x30_2e30_2e31, 0, 0, 0]);

// ERC-165 style interface ids.
pub const ERC165_INTERFACE_ID: Felt = Felt::from_limbs([0x01ff_c9a7, 0, 0, 0]);
pub const ACCOUNT_INTERFACE_ID: Felt = Felt::from_limbs([0xa66b_d575, 0, 0, 0]);

// Self-call entry points.
pub const ADD_PLUGIN: &str = "addPlugin";
pub const REMOVE_PLUGIN: &str = "removePlugin";
pub const EXECUTE_ON_PLUGIN: &str = "executeOnPlugin";

// Plugin entry points reached through `executeOnPlugin` / `read_on_plugin`.
pub const SET_PUBLIC_KEY: &str = "setPublicKey";
pub const GET_PUBLIC_KEY: &str = "getPublicKey";
pub const REVOKE_SESSION: &str = "revokeSession";
pub const IS_SESSION_REVOKED: &str = "isSessionRevoked";
