/// Acquire a handle on a place expression, recording its text, file and line.
///
/// ```ignore
/// let mut hp = 100;
/// let mut soul = borow!(hp)?;
/// let mut backup = borow!(spare, concept: soul.concept_id())?;
/// let scoped = borow!(in registry; mana, context: ctx, concept: "demo:mana")?;
/// ```
#[macro_export]
macro_rules! borow {
    (in $registry:expr; $($rest:tt)+) => {
        $crate::__borow_in!($registry; $($rest)+)
    };
    ($($rest:tt)+) => {
        $crate::__borow_in!($crate::global(); $($rest)+)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __borow_in {
    ($registry:expr; $slot:expr $(,)?) => {
        $registry.acquire(
            &mut $slot,
            ::core::option::Option::None,
            ::core::option::Option::None,
            $crate::Callsite::new(stringify!($slot), file!(), line!()),
        )
    };
    ($registry:expr; $slot:expr, context: $context:expr $(,)?) => {
        $registry.acquire(
            &mut $slot,
            ::core::option::Option::Some(&$context),
            ::core::option::Option::None,
            $crate::Callsite::new(stringify!($slot), file!(), line!()),
        )
    };
    ($registry:expr; $slot:expr, concept: $concept:expr $(,)?) => {
        $registry.acquire(
            &mut $slot,
            ::core::option::Option::None,
            ::core::option::Option::Some(::core::convert::AsRef::<str>::as_ref(&$concept)),
            $crate::Callsite::new(stringify!($slot), file!(), line!()),
        )
    };
    ($registry:expr; $slot:expr, context: $context:expr, concept: $concept:expr $(,)?) => {
        $registry.acquire(
            &mut $slot,
            ::core::option::Option::Some(&$context),
            ::core::option::Option::Some(::core::convert::AsRef::<str>::as_ref(&$concept)),
            $crate::Callsite::new(stringify!($slot), file!(), line!()),
        )
    };
}
