#[cfg(not(loom))]
pub(crate) mod export {
    pub(crate) mod sync {
        pub(crate) mod atomic {
            pub(crate) use core::sync::atomic::AtomicBool;
            pub(crate) use core::sync::atomic::AtomicU32;
            pub(crate) use core::sync::atomic::AtomicU64;
            pub(crate) use core::sync::atomic::Ordering;
        }
    }
}

#[cfg(loom)]
pub(crate) mod export {
    pub(crate) mod sync {
        pub(crate) mod atomic {
            pub(crate) use loom::sync::atomic::AtomicBool;
            pub(crate) use loom::sync::atomic::AtomicU32;
            pub(crate) use loom::sync::atomic::AtomicU64;
            pub(crate) use loom::sync::atomic::Ordering;
        }
    }
}

#[doc(inline)]
pub(crate) use self::export::*;
