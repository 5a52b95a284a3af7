use core::hash::BuildHasher;
use core::hash::Hash;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used by [`Natural`] when none is named.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used by [`Natural`] when none is named.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// Placeholder used when neither `foldhash` nor `std` is enabled.
        ///
        /// It is uninhabited and does not implement `BuildHasher`, so maps
        /// using the natural strategy must name a hasher builder explicitly.
        #[derive(Clone, Copy, Debug)]
        pub enum DefaultHashBuilder {}
    }
}

/// Multiplier for Fibonacci hashing: `2^64 / φ`, rounded to odd.
pub const GOLDEN_RATIO: u64 = 0x9E37_79B9_7F4A_7C15;

/// A `{hash, equals}` pair deciding how keys are distributed and compared.
///
/// Implementations must be consistent: `equals(a, b)` implies
/// `hash(a) == hash(b)`. Only the low 59 bits of the hash are stored, and the
/// low `log2(capacity)` bits pick the ideal slot, so strategies for poorly
/// distributed keys should move entropy into the low bits.
pub trait KeyStrategy<K: ?Sized> {
    /// Hashes `key`.
    fn hash(&self, key: &K) -> u64;

    /// Returns `true` if `a` and `b` are the same key.
    fn equals(&self, a: &K, b: &K) -> bool;
}

/// Delegates to the key's own `Hash` and `Eq` implementations.
#[derive(Clone, Copy, Debug, Default)]
pub struct Natural<B = DefaultHashBuilder> {
    hash_builder: B,
}

impl<B> Natural<B> {
    /// Creates a natural strategy hashing through `hash_builder`.
    pub fn with_hasher(hash_builder: B) -> Self {
        Self { hash_builder }
    }

    /// Returns the wrapped hasher builder.
    pub fn hasher(&self) -> &B {
        &self.hash_builder
    }
}

impl<K, B> KeyStrategy<K> for Natural<B>
where
    K: Hash + Eq + ?Sized,
    B: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self.hash_builder.hash_one(key)
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// Integer types usable with [`RawInteger`] and [`Fibonacci`].
pub trait IntegerKey: Copy + Eq {
    /// Widens the key to 64 bits. Signed keys are sign-extended, which keeps
    /// distinct keys distinct.
    fn to_u64(self) -> u64;
}

macro_rules! integer_key {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntegerKey for $t {
                #[inline(always)]
                fn to_u64(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

integer_key!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// Uses the integer key itself as the hash.
///
/// Only suitable for keys whose low bits are already well distributed, such
/// as random identifiers. Sequential keys work too since they fill
/// consecutive slots, but strided keys collide heavily.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawInteger;

impl<K: IntegerKey> KeyStrategy<K> for RawInteger {
    #[inline(always)]
    fn hash(&self, key: &K) -> u64 {
        key.to_u64()
    }

    #[inline(always)]
    fn equals(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// Golden-ratio multiplicative hashing for integer keys.
///
/// The product's top bits are the well-mixed ones, so the word is bit-reversed
/// to move them to the bottom where the slot table takes its ideal index from.
/// Each doubling of the table then consumes the next most significant bit of
/// the product, exactly as classic Fibonacci hashing would.
#[derive(Clone, Copy, Debug, Default)]
pub struct Fibonacci;

impl Fibonacci {
    /// Multiplies by the golden ratio and bit-reverses the product.
    #[inline(always)]
    pub fn mix(value: u64) -> u64 {
        value.wrapping_mul(GOLDEN_RATIO).reverse_bits()
    }
}

impl<K: IntegerKey> KeyStrategy<K> for Fibonacci {
    #[inline(always)]
    fn hash(&self, key: &K) -> u64 {
        Self::mix(key.to_u64())
    }

    #[inline(always)]
    fn equals(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// Keys compared by the address they point to rather than by value.
pub trait IdentityKey {
    /// Address of the referenced object.
    fn address(&self) -> *const ();

    /// Returns `true` if both keys point to the same object.
    fn same_object(&self, other: &Self) -> bool;
}

impl<T: ?Sized> IdentityKey for &T {
    #[inline]
    fn address(&self) -> *const () {
        *self as *const T as *const ()
    }

    #[inline]
    fn same_object(&self, other: &Self) -> bool {
        core::ptr::eq(*self, *other)
    }
}

impl<T: ?Sized> IdentityKey for alloc::rc::Rc<T> {
    #[inline]
    fn address(&self) -> *const () {
        alloc::rc::Rc::as_ptr(self) as *const ()
    }

    #[inline]
    fn same_object(&self, other: &Self) -> bool {
        alloc::rc::Rc::ptr_eq(self, other)
    }
}

#[cfg(target_has_atomic = "ptr")]
impl<T: ?Sized> IdentityKey for alloc::sync::Arc<T> {
    #[inline]
    fn address(&self) -> *const () {
        alloc::sync::Arc::as_ptr(self) as *const ()
    }

    #[inline]
    fn same_object(&self, other: &Self) -> bool {
        alloc::sync::Arc::ptr_eq(self, other)
    }
}

/// Reference identity: two keys are equal only if they point to the same
/// object.
///
/// Addresses are aligned and clustered, so they go through the Fibonacci
/// mixer before masking.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl<K: IdentityKey> KeyStrategy<K> for Identity {
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        Fibonacci::mix(key.address() as usize as u64)
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        a.same_object(b)
    }
}
