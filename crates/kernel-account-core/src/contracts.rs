//! Solidity ABI definitions for the contracts this crate talks to.
//!
//! Call encodings plus the EIP-712 structs the account checks signatures
//! against. Return data is sliced by hand where used.

use alloy_primitives::Address;
use alloy_sol_types::{Eip712Domain, eip712_domain, sol};

sol! {
    /// Kernel v2 account
    interface IKernel {
        function initialize(address defaultValidator, bytes calldata data) external payable;
        function execute(address to, uint256 value, bytes calldata data, uint8 operation) external payable;
        function getExecution(bytes4 selector) external view returns (uint48, uint48, address, address);
        function isValidSignature(bytes32 hash, bytes calldata signature) external view returns (bytes4);
    }

    /// Kernel v2 account factory
    interface IKernelFactory {
        function createAccount(address implementation, bytes calldata data, uint256 index) external payable returns (address proxy);
    }

    /// Batch helper executed through delegatecall
    interface IMultiSend {
        function multiSend(bytes memory transactions) external payable;
    }

    /// ERC-4337 EntryPoint nonce manager
    interface IEntryPoint {
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce);
    }

    /// Sudo approval of a regular validator for one selector
    struct ValidatorApproved {
        bytes4 sig;
        uint256 validatorData;
        address executor;
        bytes enableData;
    }

    /// ERC-1271 message wrapper, binds a hash to one account
    struct KernelWrapper {
        bytes32 hash;
    }
}

/// EIP-712 domain of a Kernel account
pub fn kernel_domain(account: Address, chain_id: u64, version: &str) -> Eip712Domain {
    eip712_domain! {
        name: "Kernel",
        version: version.to_owned(),
        chain_id: chain_id,
        verifying_contract: account,
    }
}
