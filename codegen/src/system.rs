use matches2::option_match;
use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::Error;

use crate::util::{parse_paren_list, Attr, Named, Result};

pub(crate) fn imp(args: TokenStream, input: TokenStream) -> Result<TokenStream> {
    let args: Attr<SystemOpt> = syn::parse2(args)?;
    let input: syn::ItemFn = syn::parse2(input)?;

    let crate_name = match args.find_one(|opt| option_match!(opt, SystemOpt::EcsworldAs(_, ts) => ts))? {
        Some((_, ts)) => ts.clone(),
        None => quote!(::ecsworld),
    };

    let ident = &input.sig.ident;
    let vis = &input.vis;
    let attrs = &input.attrs;
    let body = &input.block;

    let name = match args.find_one(|opt| option_match!(opt, SystemOpt::Name(_, name) => name))? {
        Some((_, name)) => name.value(),
        None => ident.to_string(),
    };

    if let Some(asyncness) = &input.sig.asyncness {
        return Err(Error::new_spanned(asyncness, "system functions cannot be async"));
    }
    if !input.sig.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.sig.generics,
            "system functions cannot have generic parameters",
        ));
    }
    if let syn::ReturnType::Type(_, ty) = &input.sig.output {
        return Err(Error::new_spanned(ty, "system functions cannot return values"));
    }

    let params = &input.sig.inputs;
    if params.len() != 3 {
        return Err(Error::new_spanned(
            params,
            "system functions must have exactly three parameters `(&mut World, &Snapshot, f32)`",
        ));
    }
    for param in params {
        if let syn::FnArg::Receiver(_) = param {
            return Err(Error::new_spanned(param, "system functions cannot have receivers"));
        }
    }

    let with = args.find_all(|opt| option_match!(opt, SystemOpt::With(_, types) => types)).flatten();
    let without =
        args.find_all(|opt| option_match!(opt, SystemOpt::Without(_, types) => types)).flatten();
    let active_only = args
        .find_one(|opt| option_match!(opt, SystemOpt::ActiveOnly => &()))?
        .map(|_| quote!(.active_only()));
    let before =
        args.find_all(|opt| option_match!(opt, SystemOpt::Before(_, names) => names)).flatten();
    let after =
        args.find_all(|opt| option_match!(opt, SystemOpt::After(_, names) => names)).flatten();
    let tags = args.find_all(|opt| option_match!(opt, SystemOpt::Tag(_, tags) => tags)).flatten();

    Ok(quote! {
        #(#attrs)*
        #[allow(non_camel_case_types)]
        #vis struct #ident;

        const _: () = {
            impl #crate_name::system::System for #ident {
                fn spec(&self) -> #crate_name::system::Spec {
                    #crate_name::system::Spec::new(#name)
                        #(.with::<#with>())*
                        #(.without::<#without>())*
                        #active_only
                        #(.before(#before))*
                        #(.after(#after))*
                        #(.tag(#tags))*
                }

                fn execute(&mut self, #params) #body
            }
        };
    })
}

enum SystemOpt {
    EcsworldAs(syn::token::Paren, TokenStream),
    Name(syn::Token![=], syn::LitStr),
    With(syn::Ident, Punctuated<syn::Type, syn::Token![,]>),
    Without(syn::Ident, Punctuated<syn::Type, syn::Token![,]>),
    ActiveOnly,
    Before(syn::Ident, Punctuated<syn::LitStr, syn::Token![,]>),
    After(syn::Ident, Punctuated<syn::LitStr, syn::Token![,]>),
    Tag(syn::Ident, Punctuated<syn::LitStr, syn::Token![,]>),
}

impl Parse for Named<SystemOpt> {
    fn parse(input: ParseStream) -> Result<Self> {
        let name = input.parse::<syn::Ident>()?;
        let name_string = name.to_string();

        let value = match name_string.as_str() {
            "ecsworld_as" => {
                let inner;
                let paren = syn::parenthesized!(inner in input);
                let args = inner.parse()?;
                SystemOpt::EcsworldAs(paren, args)
            }
            "name" => {
                let eq: syn::Token![=] = input.parse()?;
                let name = input.parse::<syn::LitStr>()?;
                SystemOpt::Name(eq, name)
            }
            "with" => SystemOpt::With(name.clone(), parse_paren_list(input)?),
            "without" => SystemOpt::Without(name.clone(), parse_paren_list(input)?),
            "active_only" => SystemOpt::ActiveOnly,
            "before" => SystemOpt::Before(name.clone(), parse_paren_list(input)?),
            "after" => SystemOpt::After(name.clone(), parse_paren_list(input)?),
            "tag" => SystemOpt::Tag(name.clone(), parse_paren_list(input)?),
            _ => return Err(Error::new_spanned(&name, format!("Unknown argument `{}`", name))),
        };

        Ok(Named { name, value })
    }
}
