//! # Nested Frame Flows
//!
//! CALL and CREATE behaviour observed from the outside: what state survives a
//! failing child, how gas flows back to the parent, and where the depth and
//! balance guards stop a call.

#[cfg(test)]
mod tests {
    use crate::support::{call_to, deployer, repo_with, sender, slot, word_at};
    use qc_11_evm::prelude::*;

    const FACTORY: u64 = 0xFAC7;
    const CALLER: u64 = 0xAA;
    const CALLEE: u64 = 0xBB;

    fn factory() -> Address {
        Address::from_low_u64(FACTORY)
    }

    fn caller() -> Address {
        Address::from_low_u64(CALLER)
    }

    fn callee() -> Address {
        Address::from_low_u64(CALLEE)
    }

    /// Factory code: CREATE (or CREATE2 with `salt`) a 5-byte init code and
    /// store the resulting address in slot 0.
    fn factory_code(init: [u8; 5], salt: Option<u8>) -> Vec<u8> {
        let mut code = create_code(init, salt);
        code.extend_from_slice(&[0x60, 0x00, 0x55, 0x00]); // SSTORE result at 0, STOP
        code
    }

    /// Like [`factory_code`] but RETURNs the resulting address as one word.
    fn returning_factory_code(init: [u8; 5], salt: Option<u8>) -> Vec<u8> {
        let mut code = create_code(init, salt);
        // MSTORE result at 0, RETURN 32 bytes
        code.extend_from_slice(&[0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xF3]);
        code
    }

    /// Leaves the CREATE/CREATE2 result on the stack.
    fn create_code(init: [u8; 5], salt: Option<u8>) -> Vec<u8> {
        let mut code = vec![0x64];
        code.extend_from_slice(&init); // PUSH5 init
        code.extend_from_slice(&[0x60, 0x00, 0x52]); // MSTORE at 0 -> bytes 27..32
        if let Some(salt) = salt {
            code.extend_from_slice(&[0x60, salt]);
        }
        code.extend_from_slice(&[0x60, 0x05, 0x60, 0x1B, 0x60, 0x00]); // size, offset, value
        code.push(if salt.is_some() { 0xF5 } else { 0xF0 });
        code
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    #[test]
    fn test_revert_in_nested_create_leaves_no_account() {
        // init: PUSH1 0 PUSH1 0 REVERT
        let code = factory_code([0x60, 0x00, 0x60, 0x00, 0xFD], None);
        let mut repo = repo_with(&[(factory(), &code[..])]);
        let evm = Evm::default();

        let result = evm
            .transact(&mut repo, &BlockContext::default(), &call_to(factory(), &[], 200_000))
            .unwrap();
        assert!(result.success);

        let target = compute_contract_address(factory(), 0);
        assert!(!repo.is_exist(target).unwrap());
        assert!(repo.get_code(target).unwrap().is_empty());
        assert_eq!(slot(&repo, factory(), 0), Word::ZERO);
        // The creator's nonce bump happens before the init code runs.
        assert_eq!(repo.get_nonce(factory()).unwrap(), 1);
    }

    #[test]
    fn test_nested_create_success() {
        // init: PUSH1 0 PUSH1 0 RETURN (deploys empty code)
        let code = factory_code([0x60, 0x00, 0x60, 0x00, 0xF3], None);
        let mut repo = repo_with(&[(factory(), &code[..])]);
        let evm = Evm::default();

        let result = evm
            .transact(&mut repo, &BlockContext::default(), &call_to(factory(), &[], 200_000))
            .unwrap();
        assert!(result.success);

        let target = compute_contract_address(factory(), 0);
        assert!(repo.is_exist(target).unwrap());
        assert_eq!(repo.get_nonce(target).unwrap(), 1);
        assert_eq!(slot(&repo, factory(), 0), Word::from(target));
    }

    #[test]
    fn test_create2_address_derivation() {
        let init = [0x60, 0x00, 0x60, 0x00, 0xF3];
        let code = factory_code(init, Some(7));
        let mut repo = repo_with(&[(factory(), &code[..])]);
        let evm = Evm::default();

        evm.transact(&mut repo, &BlockContext::default(), &call_to(factory(), &[], 200_000))
            .unwrap();

        let mut salt = [0u8; 32];
        salt[31] = 7;
        let target = compute_contract_address_create2(factory(), &salt, &init);
        assert!(repo.is_exist(target).unwrap());
        assert_eq!(slot(&repo, factory(), 0), Word::from(target));
    }

    #[test]
    fn test_create2_collision_fails() {
        let init = [0x60, 0x00, 0x60, 0x00, 0xF3];
        let code = returning_factory_code(init, Some(7));
        let mut repo = repo_with(&[(factory(), &code[..])]);
        let evm = Evm::default();
        let block = BlockContext::default();

        let first = evm
            .transact(&mut repo, &block, &call_to(factory(), &[], 200_000))
            .unwrap();
        assert!(first.success);
        let mut salt = [0u8; 32];
        salt[31] = 7;
        let target = compute_contract_address_create2(factory(), &salt, &init);
        assert_eq!(word_at(&first.return_data, 0), Word::from(target));

        // Same salt and init code again: the address is taken. The child's
        // gas is burnt but the factory keeps enough to return the zero result.
        let second = evm
            .transact(&mut repo, &block, &call_to(factory(), &[], 200_000))
            .unwrap();
        assert!(second.success);
        assert_eq!(word_at(&second.return_data, 0), Word::ZERO);
        assert!(repo.is_exist(target).unwrap());
    }

    #[test]
    fn test_deployed_code_is_callable() {
        // runtime: PUSH1 0x2A PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
        let runtime = [0x60, 0x2A, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xF3];
        let mut repo = repo_with(&[]);
        let evm = Evm::default();
        let block = BlockContext::default();

        let create = Message::create(
            sender(),
            U256::zero(),
            Bytes::from_vec(deployer(&runtime)),
            300_000,
        );
        let deployed = evm.transact(&mut repo, &block, &create).unwrap();
        let address = deployed.new_address.unwrap();

        let output = evm
            .transact(&mut repo, &block, &call_to(address, &[], 100_000))
            .unwrap();
        assert_eq!(word_at(&output.return_data, 0), Word::from(0x2Au64));
    }

    #[test]
    fn test_code_size_limit() {
        // Init code returning 24_577 zero bytes: PUSH2 0x6001 PUSH1 0 RETURN
        let init = [0x61, 0x60, 0x01, 0x60, 0x00, 0xF3];
        let mut repo = repo_with(&[]);
        let evm = Evm::default();

        let create = Message::create(sender(), U256::zero(), Bytes::from_slice(&init), 10_000_000);
        let result = evm
            .transact(&mut repo, &BlockContext::default(), &create)
            .unwrap();
        assert!(!result.success);
        assert!(matches!(
            result.exception,
            Some(ExceptionKind::CodeSizeLimit { size: 24_577, max: 24_576 })
        ));
        let target = compute_contract_address(sender(), 0);
        assert!(!repo.is_exist(target).unwrap());
    }

    // =========================================================================
    // CALL
    // =========================================================================

    #[test]
    fn test_insufficient_call_gas_only_charges_forwarded() {
        // callee: PUSH1 1 PUSH1 0 SSTORE (20_000+ gas)
        let callee_code = [0x60, 0x01, 0x60, 0x00, 0x55];
        // caller: CALL(5000, callee, 0, 0, 0, 0, 0); SSTORE flag at 0; STOP
        let caller_code = [
            0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // out, in, value
            0x60, CALLEE as u8, // to
            0x61, 0x13, 0x88, // gas 5000
            0xF1, // CALL
            0x60, 0x00, 0x55, // SSTORE
            0x00,
        ];
        let mut repo = repo_with(&[(caller(), &caller_code[..]), (callee(), &callee_code[..])]);
        let evm = Evm::default();

        let result = evm
            .transact(&mut repo, &BlockContext::default(), &call_to(caller(), &[], 100_000))
            .unwrap();
        assert!(result.success);
        assert_eq!(slot(&repo, caller(), 0), Word::ZERO);
        assert!(repo.storage_of(callee()).is_empty());

        // 7 pushes, CALL base, the 5000 the child burned, PUSH1, no-op SSTORE.
        let rules = evm.rules();
        let execution = 7 * 3 + rules.gas.call + 5_000 + 3 + rules.gas.sstore_noop;
        assert_eq!(result.gas_used, 21_000 + execution);
    }

    #[test]
    fn test_value_call_needs_balance() {
        // CALL(0, callee, 1, 0, 0, 0, 0); SSTORE flag at 0; STOP
        let caller_code = [
            0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // out, in
            0x60, 0x01, // value
            0x60, CALLEE as u8, // to
            0x60, 0x00, // gas
            0xF1, 0x60, 0x00, 0x55, 0x00,
        ];
        let evm = Evm::default();
        let block = BlockContext::default();

        let mut poor = repo_with(&[(caller(), &caller_code[..])]);
        evm.transact(&mut poor, &block, &call_to(caller(), &[], 200_000))
            .unwrap();
        assert_eq!(slot(&poor, caller(), 0), Word::ZERO);
        assert!(poor.get_balance(callee()).unwrap().is_zero());

        let mut rich = repo_with(&[(caller(), &caller_code[..])]);
        rich.set_balance(caller(), U256::from(5));
        evm.transact(&mut rich, &block, &call_to(caller(), &[], 200_000))
            .unwrap();
        assert_eq!(slot(&rich, caller(), 0), Word::ONE);
        assert_eq!(rich.get_balance(callee()).unwrap(), U256::one());
        assert_eq!(rich.get_balance(caller()).unwrap(), U256::from(4));
    }

    #[test]
    fn test_staticcall_blocks_writes() {
        // caller: STATICCALL(0xFFFF, callee, 0, 0, 0, 0); SSTORE flag at 0
        let caller_code = [
            0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // out, in
            0x60, CALLEE as u8, // to
            0x61, 0xFF, 0xFF, // gas
            0xFA, 0x60, 0x00, 0x55, 0x00,
        ];
        let evm = Evm::default();
        let block = BlockContext::default();

        let writer = [0x60, 0x01, 0x60, 0x00, 0x55];
        let mut repo = repo_with(&[(caller(), &caller_code[..]), (callee(), &writer[..])]);
        evm.transact(&mut repo, &block, &call_to(caller(), &[], 200_000))
            .unwrap();
        assert_eq!(slot(&repo, caller(), 0), Word::ZERO);
        assert!(repo.storage_of(callee()).is_empty());

        // A pure callee succeeds under the same call.
        let reader = [0x60, 0x00, 0x54, 0x50, 0x00]; // SLOAD 0, POP, STOP
        let mut repo = repo_with(&[(caller(), &caller_code[..]), (callee(), &reader[..])]);
        evm.transact(&mut repo, &block, &call_to(caller(), &[], 200_000))
            .unwrap();
        assert_eq!(slot(&repo, caller(), 0), Word::ONE);
    }

    #[test]
    fn test_depth_limit_stops_recursion() {
        // SLOAD 0, +1, SSTORE 0, CALL(GAS, ADDRESS, 0, 0, 0, 0, 0), STOP
        let recursive = [
            0x60, 0x00, 0x54, 0x60, 0x01, 0x01, 0x60, 0x00, 0x55, // counter++
            0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // out, in, value
            0x30, 0x5A, 0xF1, 0x00,
        ];
        let config = EvmConfig {
            rules_json: Some(r#"{"max_call_depth": 4}"#.to_string()),
            ..EvmConfig::default()
        };
        let evm = Evm::new(&config).unwrap();
        let mut repo = repo_with(&[(caller(), &recursive[..])]);

        let result = evm
            .transact(&mut repo, &BlockContext::default(), &call_to(caller(), &[], 3_000_000))
            .unwrap();
        assert!(result.success);
        // Frames at depth 0 through 4 ran; the call into depth 5 was refused.
        assert_eq!(slot(&repo, caller(), 0), Word::from(5u64));
    }

    #[test]
    fn test_child_logs_dropped_on_failure() {
        // callee: LOG0 over 32 bytes, then INVALID
        let callee_code = [0x60, 0x20, 0x60, 0x00, 0xA0, 0xFE];
        let caller_code = [
            0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // out, in, value
            0x60, CALLEE as u8, 0x61, 0xFF, 0xFF, 0xF1, // CALL
            0x60, 0x20, 0x60, 0x00, 0xA0, // LOG0 in the caller
            0x00,
        ];
        let mut repo = repo_with(&[(caller(), &caller_code[..]), (callee(), &callee_code[..])]);
        let evm = Evm::default();

        let result = evm
            .transact(&mut repo, &BlockContext::default(), &call_to(caller(), &[], 200_000))
            .unwrap();
        assert!(result.success);
        assert_eq!(result.logs.len(), 1);
        assert_eq!(result.logs[0].address, caller());
    }

    #[test]
    fn test_log_topics_and_data() {
        // PUSH1 0x2A PUSH1 0 MSTORE; LOG1(0, 32, 0x1234)
        let code = [
            0x60, 0x2A, 0x60, 0x00, 0x52, 0x61, 0x12, 0x34, 0x60, 0x20, 0x60, 0x00, 0xA1, 0x00,
        ];
        let mut repo = repo_with(&[(caller(), &code[..])]);
        let evm = Evm::default();

        let result = evm
            .transact(&mut repo, &BlockContext::default(), &call_to(caller(), &[], 100_000))
            .unwrap();
        let log = &result.logs[0];
        let mut topic = [0u8; 32];
        topic[30] = 0x12;
        topic[31] = 0x34;
        assert_eq!(log.topics, vec![Hash::new(topic)]);
        assert_eq!(Word::from_be_slice(log.data.as_slice()), Word::from(0x2Au64));
    }

    #[test]
    fn test_blockhash_window() {
        // BLOCKHASH(299) -> mem[0], BLOCKHASH(10) -> mem[32], RETURN 64 bytes
        let code = [
            0x61, 0x01, 0x2B, 0x40, 0x60, 0x00, 0x52, // 299
            0x60, 0x0A, 0x40, 0x60, 0x20, 0x52, // 10
            0x60, 0x40, 0x60, 0x00, 0xF3,
        ];
        let recent = Hash::new([0x11; 32]);
        let ancient = Hash::new([0x22; 32]);
        let hashes = InMemoryBlockHashes::new()
            .with_hash(299, recent)
            .with_hash(10, ancient);
        let evm = Evm::default().with_block_hashes(std::sync::Arc::new(hashes));
        let mut repo = repo_with(&[(caller(), &code[..])]);
        let block = BlockContext {
            number: 300,
            ..BlockContext::default()
        };

        let result = evm
            .transact(&mut repo, &block, &call_to(caller(), &[], 100_000))
            .unwrap();
        assert_eq!(
            word_at(&result.return_data, 0),
            Word::from_be_slice(recent.as_bytes())
        );
        assert_eq!(word_at(&result.return_data, 1), Word::ZERO);
    }

    #[test]
    fn test_estimate_through_execution_api() {
        let code = [0x60, 0x01, 0x60, 0x00, 0x55];
        let mut repo = repo_with(&[(caller(), &code[..])]);
        let evm = Evm::default();
        let api: &dyn ExecutionApi = &evm;

        let estimate = api
            .estimate_gas(&mut repo, &BlockContext::default(), &call_to(caller(), &[], 500_000))
            .unwrap();
        assert_eq!(estimate, Some(21_000 + 3 + 3 + 20_000));
    }

    #[test]
    fn test_simulate_batch_matches_sequential() {
        let code = [0x60, 0x01, 0x60, 0x00, 0x55];
        let repo = repo_with(&[(caller(), &code[..])]);
        let evm = Evm::default();
        let block = BlockContext::default();
        let messages: Vec<Message> = (0..16)
            .map(|i| call_to(caller(), &[i], 100_000))
            .collect();

        let parallel = evm.simulate_batch(&repo, &block, &messages);
        for (message, simulated) in messages.iter().zip(parallel) {
            let mut copy = repo.clone();
            let sequential = evm.transact(&mut copy, &block, message).unwrap();
            assert_eq!(simulated.unwrap(), sequential);
        }
    }
}
