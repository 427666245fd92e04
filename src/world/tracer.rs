//! Exposes testing, profiling and tracing capabilities.

use crate::entity::{EntityId, SampleId};
use crate::system::System;

/// Defines the [`Tracer`] trait and implements the [`Log`] and [`Aggregate`] types.
///
/// All tracer method parameters must be either [`Copy`] or a mutable reference
/// (or immutable reference, which is [`Copy`]).
/// Parameters after `@NOLOG` are not printed by [`Log`].
macro_rules! define_tracer {
    (
        $(
            $(#[$meta:meta])*
            fn $name:ident(
                &self
                $(,$logged_ident:ident: $logged_ty:ty)*
                $(; @NOLOG $($nolog_ident:ident: $nolog_ty:ty),*)?
                $(,)?
            );
        )*
    ) => {
        /// A tracer used for recording the events throughout a tick.
        ///
        /// Can be used for profiling and testing.
        pub trait Tracer: Sync {
            $(
                $(#[$meta])*
                #[allow(unused_variables)]
                fn $name(&self, $($logged_ident: $logged_ty,)* $($($nolog_ident: $nolog_ty,)*)?) {}
            )*
        }

        impl Tracer for Log {
            $(
                #[allow(unused_variables)]
                fn $name(&self, $($logged_ident: $logged_ty,)* $($($nolog_ident: $nolog_ty,)*)?) {
                    log::log!(self.0, concat!(stringify!($name), "(", $(
                        stringify!($logged_ident),
                        " = {",
                        stringify!($logged_ident),
                        ":?}, ",
                    )* ")"), $(
                        $logged_ident = $logged_ident,
                    )*);
                }
            )*
        }

        impl_tuple_accumulate! {
            @TYPES (T1, T2, T3, T4, T5, T6, T7, T8);
            $(
                @VARS (t1, t2, t3, t4, t5, t6, t7, t8);
                @METHOD {fn $name(&self, $($logged_ident: $logged_ty,)* $($($nolog_ident: $nolog_ty,)*)?);}
            )*
        }
    };
}

macro_rules! impl_tuple {
    (
        @TYPES ($($ty:ident),* $(,)?);
        $(
            @VARS ($($vars:ident),* $(,)?);
            @METHOD {fn $name:ident(&self, $($arg_ident:ident: $arg_ty:ty,)*);}
        )*
    ) => {
        impl<$($ty: Tracer),*> Tracer for Aggregate<($($ty,)*)> {
            $(
                fn $name(&self, $($arg_ident: $arg_ty),*) {
                    #[allow(unused_mut, unused_variables)]
                    let mut args = ($($arg_ident,)*);

                    #[allow(dead_code)]
                    fn call_with_args(tracer: &impl Tracer, ($($arg_ident,)*): &mut ($($arg_ty,)*)) {
                        tracer.$name($(*$arg_ident,)*);
                    }

                    let Aggregate(($($vars,)*)) = self;
                    $(
                        call_with_args($vars, &mut args);
                    )*
                }
            )*
        }
    };
}

macro_rules! impl_tuple_accumulate {
    (@TYPES (); $(@VARS (); @METHOD {$($body:tt)*})*) => {
        impl_tuple! {
            @TYPES ();
            $(
                @VARS ();
                @METHOD {$($body)*}
            )*
        }
    };
    (
        @TYPES ($first_ty:ident $(, $rest_ty:ident)* $(,)?);
        $(
            @VARS ($first_var:ident $(, $rest_var:ident)* $(,)?);
            @METHOD {$($body:tt)*}
        )*
    ) => {
        impl_tuple! {
            @TYPES ($first_ty $(, $rest_ty)* );
            $(
                @VARS ($first_var $(, $rest_var)*);
                @METHOD {$($body)*}
            )*
        }

        impl_tuple_accumulate! {
            @TYPES ($($rest_ty),*);
            $(
                @VARS ($($rest_var),*);
                @METHOD {$($body)*}
            )*
        }
    };
}

define_tracer! {
    /// A tick starts.
    fn start_tick(&self, frame: u64);

    /// A tick ends.
    fn end_tick(&self, frame: u64);

    /// A flush starts with the given number of queued operations.
    fn start_flush(&self, frame: u64, operations: usize);

    /// A flush ends. Also passes the number of operations queued for rerun.
    fn end_flush(&self, frame: u64, rerun: usize);

    /// A system starts running.
    fn start_run_system(
        &self,
        position: usize,
        name: &str;
        @NOLOG
        system: &mut dyn System,
    );

    /// A system stops running.
    fn end_run_system(
        &self,
        position: usize,
        name: &str;
        @NOLOG
        system: &mut dyn System,
    );

    /// An entity has become live.
    fn join_entity(&self, entity: EntityId);

    /// An entity has been freed.
    fn free_entity(&self, entity: EntityId);

    /// An entity started matching a sample.
    fn sample_insert(&self, sample: SampleId, entity: EntityId);

    /// An entity stopped matching a sample.
    fn sample_remove(&self, sample: SampleId, entity: EntityId);
}

/// An empty tracer.
pub struct Noop;

impl Tracer for Noop {}

/// Groups multiple tracers into a tuple and dispatches each call to them in serial.
pub struct Aggregate<T>(
    /// A tuple of child tracers to execute in serial.
    pub T,
);

/// A tracer that logs all events.
pub struct Log(
    /// The log level to log events with.
    pub log::Level,
);
