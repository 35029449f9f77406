use std::collections::BTreeSet;

use ethers::abi::{Abi, AbiEncode};
use ethers::contract::{EthCall, EthError};
use ethers::types::Bytes;
use rights_policy_manager::{
    GetActivePolicyCall, RightsPolicyManagerCalls, RightsPolicyManagerErrors, METADATA,
    UUPSUnsupportedProxiableUUID,
};
use serde_json::Value;

fn artifact() -> Value {
    let raw = std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/abi/RightsPolicyManager.json"
    ))
    .unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn bindings_match_artifact_on_disk() {
    let artifact = artifact();
    let abi: Abi = serde_json::from_value(artifact["abi"].clone()).unwrap();

    let on_disk: BTreeSet<_> = abi.functions().map(|f| f.signature()).collect();
    let bound: BTreeSet<_> = METADATA.abi().functions().map(|f| f.signature()).collect();
    assert_eq!(on_disk, bound);

    let bytecode: Bytes = artifact["bytecode"].as_str().unwrap().parse().unwrap();
    assert_eq!(&bytecode, METADATA.bytecode());
}

#[test]
fn calldata_roundtrips_through_calls_enum() {
    use ethers::abi::AbiDecode;
    use ethers::types::{Address, U256};

    let call = GetActivePolicyCall {
        account: Address::repeat_byte(0x01),
        asset_id: U256::from(99),
    };
    let data = call.clone().encode();
    assert_eq!(&data[..4], &GetActivePolicyCall::selector());

    match RightsPolicyManagerCalls::decode(&data).unwrap() {
        RightsPolicyManagerCalls::GetActivePolicy(decoded) => assert_eq!(decoded, call),
        other => panic!("decoded into {other:?}"),
    }
}

#[test]
fn uups_error_selector_is_stable() {
    // UUPSUnsupportedProxiableUUID(bytes32)
    assert_eq!(UUPSUnsupportedProxiableUUID::selector(), [0xaa, 0x1d, 0x49, 0xa4]);

    let err = UUPSUnsupportedProxiableUUID { slot: [0x11; 32] };
    let decoded =
        <RightsPolicyManagerErrors as ethers::contract::ContractRevert>::decode_with_selector(
            &err.clone().encode(),
        )
        .unwrap();
    assert_eq!(
        decoded,
        RightsPolicyManagerErrors::UUPSUnsupportedProxiableUUID(err)
    );
}
