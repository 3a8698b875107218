//! Property tests for lock aggregate classification.

use dac_control::{LockMask, LockStatus, MAX_DEVICES};

fn mask(devices: usize, locked: u32, failed: u32) -> LockMask {
    let mut mask = LockMask::EMPTY;
    for index in 0..devices {
        let flag = 1u32.wrapping_shl(u32::try_from(index).unwrap_or(0));
        if failed & flag != 0 {
            mask.set_read_error(index, devices);
        } else if locked & flag != 0 {
            mask.set_locked(index);
        }
    }
    mask
}

proptest::proptest! {
    #[test]
    fn any_read_failure_classifies_as_read_error(
        devices in 1usize..=MAX_DEVICES,
        locked in proptest::num::u32::ANY,
        failed in 1u32..,
    ) {
        let failed = failed & 1u32.wrapping_shl(u32::try_from(devices).unwrap_or(0)).wrapping_sub(1);
        proptest::prop_assume!(failed != 0);
        let mask = mask(devices, locked, failed);
        proptest::prop_assert_eq!(mask.status(devices), LockStatus::ReadError);
    }

    #[test]
    fn clean_reads_classify_by_lock_bits(
        devices in 1usize..=MAX_DEVICES,
        locked in proptest::num::u32::ANY,
    ) {
        let mask = mask(devices, locked, 0);
        let every = (0..devices).all(|index| mask.is_locked(index));
        let expected = if every { LockStatus::Locked } else { LockStatus::Unlocked };
        proptest::prop_assert_eq!(mask.status(devices), expected);
        proptest::prop_assert_eq!(every, mask == LockMask::all_locked(devices));
    }

    #[test]
    fn read_error_bit_does_not_alias_another_device(
        devices in 1usize..=MAX_DEVICES,
        index in 0usize..MAX_DEVICES,
    ) {
        proptest::prop_assume!(index < devices);
        let mut mask = LockMask::EMPTY;
        mask.set_read_error(index, devices);
        proptest::prop_assert!(mask.read_failed(index, devices));
        proptest::prop_assert!((0..devices).all(|other| !mask.is_locked(other)));
    }
}
