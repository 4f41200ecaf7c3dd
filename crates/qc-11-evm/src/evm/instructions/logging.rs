//! LOG0..LOG4.

use crate::domain::entities::Log;
use crate::domain::value_objects::{Bytes, Hash};
use crate::errors::VmError;
use crate::evm::gas::log_data_cost;
use crate::evm::host::{Control, Host};
use crate::evm::program::Program;

/// LOGn: emits a log with `N` topics. The base and per-topic costs are in the
/// opcode table; the data length is charged here.
pub fn op_log<const N: usize>(
    program: &mut Program,
    host: &mut Host<'_>,
) -> Result<Control, VmError> {
    program.require_mutable()?;
    let [offset, size] = program.stack_mut().pop_n::<2>()?;
    let topics = program.stack_mut().pop_n::<N>()?;

    let (offset, size) = program.charge_memory(offset, size, &host.rules.gas)?;
    program.spend_gas(log_data_cost(&host.rules.gas, size))?;

    let data = program.memory().read(offset, size);
    let log = Log::new(
        program.env().address,
        topics
            .iter()
            .map(|topic| Hash::new(topic.to_be_bytes()))
            .collect(),
        Bytes::from_vec(data),
    );
    program.push_log(log);
    Ok(Control::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExceptionKind;
    use crate::evm::instructions::test_support::Bench;
    use crate::evm::program::tests::invocation;
    use crate::evm::word::Word;

    #[test]
    fn test_log2_collects_topics_and_data() {
        let mut bench = Bench::new();
        bench.program.memory_mut().write(0, &[0xAB, 0xCD]);
        // topic2, topic1, size, offset (offset on top)
        let mut bench = bench.stack(&[0x22, 0x11, 2, 0]);
        let before = bench.program.gas_remaining();
        bench.run(op_log::<2>).unwrap();

        let log = &bench.program.logs()[0];
        assert_eq!(log.address, bench.program.env().address);
        assert_eq!(log.topics.len(), 2);
        assert_eq!(log.topics[0], Hash::new(Word::from(0x11u64).to_be_bytes()));
        assert_eq!(log.topics[1], Hash::new(Word::from(0x22u64).to_be_bytes()));
        assert_eq!(log.data.as_slice(), &[0xAB, 0xCD]);
        // 8 per data byte, memory already covered
        assert_eq!(before - bench.program.gas_remaining(), 16);
    }

    #[test]
    fn test_log_forbidden_in_static_frame() {
        let mut env = invocation();
        env.is_static = true;
        let mut bench = Bench::with_env(env, Bytes::new()).stack(&[0, 0]);
        let err = bench.run(op_log::<0>).unwrap_err();
        assert_eq!(err.exception(), Some(ExceptionKind::StaticCallStateChange));
    }
}
