//! # Precompile Flows
//!
//! Precompiled contracts reached through real CALL/STATICCALL bytecode, so
//! the dispatch, the gas hand-off and the output copy are all exercised.

#[cfg(test)]
mod tests {
    use crate::support::{call_to, repo_with, word_at};
    use k256::ecdsa::SigningKey;
    use qc_11_evm::prelude::*;

    fn proxy() -> Address {
        Address::from_low_u64(0x9090)
    }

    /// Proxy code: copy calldata to memory, CALL `precompile` with it, return
    /// the first `out_len` bytes of the output.
    fn proxy_code(precompile: u8, out_len: u8) -> Vec<u8> {
        vec![
            0x36, 0x60, 0x00, 0x60, 0x00, 0x37, // CALLDATACOPY(0, 0, CALLDATASIZE)
            0x60, out_len, 0x60, 0x00, // out
            0x36, 0x60, 0x00, // in: CALLDATASIZE, 0
            0x60, 0x00, // value
            0x60, precompile, // to
            0x62, 0x0F, 0xFF, 0xFF, // gas
            0xF1, 0x50, // CALL, POP
            0x60, out_len, 0x60, 0x00, 0xF3, // RETURN
        ]
    }

    fn run(precompile: u8, out_len: u8, input: &[u8], rules: ForkRules) -> CallResult {
        let code = proxy_code(precompile, out_len);
        let mut repo = repo_with(&[(proxy(), &code[..])]);
        Evm::with_rules(rules)
            .transact(&mut repo, &BlockContext::default(), &call_to(proxy(), input, 2_000_000))
            .unwrap()
    }

    #[test]
    fn test_sha256_through_call() {
        let result = run(0x02, 32, b"abc", ForkRules::default());
        assert_eq!(
            hex::encode(result.return_data.as_slice()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_ripemd160_through_call() {
        let result = run(0x03, 32, b"abc", ForkRules::default());
        assert_eq!(
            hex::encode(result.return_data.as_slice()),
            "0000000000000000000000008eb208f7e05d987a9b044a8e98c6b087f15a0bfc"
        );
    }

    #[test]
    fn test_identity_through_call() {
        let input = [0xDE, 0xAD, 0xBE, 0xEF];
        let result = run(0x04, 4, &input, ForkRules::default());
        assert_eq!(result.return_data.as_slice(), &input);
    }

    #[test]
    fn test_ecrecover_through_call() {
        let key = SigningKey::from_slice(&[0x07; 32]).unwrap();
        let hash = keccak256(b"transfer 1 ether");
        let (signature, recovery_id) = key.sign_prehash_recoverable(hash.as_bytes()).unwrap();

        let mut input = vec![0u8; 128];
        input[..32].copy_from_slice(hash.as_bytes());
        input[63] = 27 + recovery_id.to_byte();
        input[64..].copy_from_slice(&signature.to_bytes());

        let point = key.verifying_key().to_encoded_point(false);
        let expected = keccak256(&point.as_bytes()[1..]);

        let result = run(0x01, 32, &input, ForkRules::default());
        assert_eq!(&result.return_data.as_slice()[12..], &expected.as_bytes()[12..]);
    }

    #[test]
    fn test_modexp_only_from_byzantium() {
        // 3^5 mod 7 = 5
        let mut input = vec![0u8; 96];
        input[31] = 1;
        input[63] = 1;
        input[95] = 1;
        input.extend_from_slice(&[3, 5, 7]);

        let result = run(0x05, 1, &input, ForkRules::for_fork(Fork::Byzantium));
        assert_eq!(result.return_data.as_slice(), &[5]);

        // Before Byzantium 0x05 is an ordinary empty account: no output.
        let result = run(0x05, 1, &input, ForkRules::for_fork(Fork::Homestead));
        assert!(result.success);
        assert_eq!(result.return_data.as_slice(), &[0]);
    }

    #[test]
    fn test_precompile_out_of_gas_fails_only_the_call() {
        // STATICCALL ecrecover with 100 gas, then return the flag.
        let code = [
            0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // out, in
            0x60, 0x01, 0x60, 0x64, // to, gas 100
            0xFA, 0x60, 0x00, 0x52, // STATICCALL, MSTORE flag
            0x60, 0x20, 0x60, 0x00, 0xF3,
        ];
        let mut repo = repo_with(&[(proxy(), &code[..])]);
        let result = Evm::default()
            .transact(&mut repo, &BlockContext::default(), &call_to(proxy(), &[], 200_000))
            .unwrap();
        assert!(result.success);
        assert_eq!(word_at(&result.return_data, 0), Word::ZERO);
    }
}
