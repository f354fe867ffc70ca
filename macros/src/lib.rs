//! Derive macros for Marquee action enums.
//!
//! `#[derive(Action)]` classifies the variants of an action enum so runtime
//! callers can tell commands from the events they produce, and can recognise
//! the events that finish a flow.
//!
//! # Example
//!
//! ```ignore
//! use marquee_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum BookingAction {
//!     #[command]
//!     Submit,
//!
//!     #[event]
//!     #[terminal]
//!     BookingConfirmed { reference: String },
//! }
//!
//! assert!(BookingAction::Submit.is_command());
//! assert!(BookingAction::BookingConfirmed { reference: "BK1".into() }.is_terminal());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Variant, parse_macro_input};

/// Derive macro for Action enums
///
/// Generates:
/// - `is_command()` - true for variants marked `#[command]`
/// - `is_event()` - true for variants marked `#[event]`
/// - `is_terminal()` - true for variants marked `#[terminal]`
/// - `action_name()` - the variant name, for logs
///
/// # Errors (compile time)
///
/// - Applied to a non-enum type
/// - A variant has both `#[command]` and `#[event]`
/// - A `#[terminal]` variant is not also an `#[event]`
#[proc_macro_derive(Action, attributes(command, event, terminal))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_action(&input) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand_action(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "#[derive(Action)] can only be used on enums",
        ));
    };

    let mut command_arms = Vec::new();
    let mut event_arms = Vec::new();
    let mut terminal_arms = Vec::new();
    let mut name_arms = Vec::new();

    for variant in &data_enum.variants {
        let is_command = has_attribute(&variant.attrs, "command");
        let is_event = has_attribute(&variant.attrs, "event");
        let is_terminal = has_attribute(&variant.attrs, "terminal");

        if is_command && is_event {
            return Err(syn::Error::new_spanned(
                variant,
                "Variant cannot be both #[command] and #[event]",
            ));
        }
        if is_terminal && !is_event {
            return Err(syn::Error::new_spanned(
                variant,
                "#[terminal] variants must also be #[event]",
            ));
        }

        let pattern = variant_pattern(variant);
        if is_command {
            command_arms.push(quote! { #pattern => true, });
        }
        if is_event {
            event_arms.push(quote! { #pattern => true, });
        }
        if is_terminal {
            terminal_arms.push(quote! { #pattern => true, });
        }
        let label = variant.ident.to_string();
        name_arms.push(quote! { #pattern => #label, });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #name #ty_generics #where_clause {
            /// Returns true if this action is a command
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn is_command(&self) -> bool {
                match self {
                    #(#command_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action is an event
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn is_event(&self) -> bool {
                match self {
                    #(#event_arms)*
                    _ => false,
                }
            }

            /// Returns true if this event ends the flow that produced it
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn is_terminal(&self) -> bool {
                match self {
                    #(#terminal_arms)*
                    _ => false,
                }
            }

            /// Returns the variant name
            #[must_use]
            pub const fn action_name(&self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }
        }
    })
}

fn variant_pattern(variant: &Variant) -> TokenStream2 {
    let ident = &variant.ident;
    match &variant.fields {
        Fields::Named(_) => quote! { Self::#ident { .. } },
        Fields::Unnamed(_) => quote! { Self::#ident(..) },
        Fields::Unit => quote! { Self::#ident },
    }
}

fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
