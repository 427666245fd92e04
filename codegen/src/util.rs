use proc_macro2::{Span, TokenStream};
use quote::{quote, quote_spanned, ToTokens};
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::Error;

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

/// A comma-separated list of named options.
pub(crate) struct Attr<T> {
    pub(crate) items: Punctuated<Named<T>, syn::Token![,]>,
}

impl<T> Default for Attr<T> {
    fn default() -> Self { Self { items: Punctuated::new() } }
}

impl<T> Parse for Attr<T>
where
    Named<T>: Parse,
{
    fn parse(input: ParseStream) -> Result<Self> {
        Ok(Self { items: Punctuated::parse_terminated(input)? })
    }
}

impl<T> Attr<T> {
    /// Finds the only option matched by `matcher`.
    /// Returns an error if the option is specified more than once.
    pub(crate) fn find_one<U>(
        &self,
        matcher: impl Fn(&T) -> Option<&U>,
    ) -> Result<Option<(Span, &U)>> {
        let mut found = None;

        for item in &self.items {
            if let Some(value) = matcher(&item.value) {
                if found.is_some() {
                    return Err(Error::new_spanned(
                        &item.name,
                        format!("Duplicate argument `{}`", item.name),
                    ));
                }
                found = Some((item.name.span(), value));
            }
        }

        Ok(found)
    }

    /// Collects all options matched by `matcher`.
    pub(crate) fn find_all<'t, U: 't>(
        &'t self,
        matcher: impl Fn(&'t T) -> Option<U> + 't,
    ) -> impl Iterator<Item = U> + 't {
        self.items.iter().filter_map(move |item| matcher(&item.value))
    }
}

/// An option in the form `name`, `name = value` or `name(values)`.
pub(crate) struct Named<T> {
    pub(crate) name:  syn::Ident,
    pub(crate) value: T,
}

/// Parses `(a, b, c)` into a list.
pub(crate) fn parse_paren_list<T: Parse>(input: ParseStream) -> Result<Punctuated<T, syn::Token![,]>> {
    let inner;
    syn::parenthesized!(inner in input);
    Punctuated::parse_terminated(&inner)
}

pub(crate) fn parse_generics(input: &syn::DeriveInput) -> ParsedGenerics {
    let generics = &input.generics;

    let (decl, usage) = if input.generics.params.is_empty() {
        (quote!(), quote!())
    } else {
        let decl: Vec<_> = input.generics.params.iter().collect();
        let usage: Vec<_> = input
            .generics
            .params
            .iter()
            .map(|param| match param {
                syn::GenericParam::Type(syn::TypeParam { ident, .. }) => quote!(#ident),
                syn::GenericParam::Lifetime(syn::LifetimeParam { lifetime, .. }) => {
                    quote!(#lifetime)
                }
                syn::GenericParam::Const(syn::ConstParam { ident, .. }) => quote!(#ident),
            })
            .collect();
        (
            quote_spanned!(generics.span() => <#(#decl),*>),
            quote_spanned!(generics.span() => <#(#usage),*>),
        )
    };

    let where_ = &input.generics.where_clause;

    ParsedGenerics { ident: input.ident.clone(), decl, usage, where_: where_.to_token_stream() }
}

pub(crate) struct ParsedGenerics {
    pub(crate) ident:  proc_macro2::Ident,
    pub(crate) decl:   TokenStream,
    pub(crate) usage:  TokenStream,
    pub(crate) where_: TokenStream,
}

impl ParsedGenerics {
    pub(crate) fn impl_trait(&self, trait_: TokenStream, body: TokenStream) -> TokenStream {
        let Self { ident, decl, usage, where_ } = self;
        quote! {
            impl #decl #trait_ for #ident #usage #where_ {
                #body
            }
        }
    }
}
