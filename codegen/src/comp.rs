use matches2::option_match;
use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::Error;

use crate::util::{self, Attr, Named, Result};

pub(crate) fn imp(args: TokenStream, input: TokenStream) -> Result<TokenStream> {
    let args: Attr<CompOpt> = syn::parse2(args)?;

    let crate_name = match args.find_one(|opt| option_match!(opt, CompOpt::EcsworldAs(_, ts) => ts))? {
        Some((_, ts)) => ts.clone(),
        None => quote!(::ecsworld),
    };

    let mut hooks = TokenStream::new();
    for hook in Hook::ALL {
        let path = args.find_one(|opt| match opt {
            CompOpt::Hook(kind, _, path) if *kind == hook => Some(path),
            _ => None,
        })?;

        if let Some((_, path)) = path {
            hooks.extend(hook.forward(&crate_name, path));
        }
    }

    let input: syn::DeriveInput = syn::parse2(input)?;
    let generics = util::parse_generics(&input);
    let output = generics.impl_trait(quote!(#crate_name::comp::Component), hooks);

    Ok(quote! {
        #input
        #output
    })
}

enum CompOpt {
    EcsworldAs(syn::token::Paren, TokenStream),
    Hook(Hook, syn::Token![=], syn::Path),
}

impl Parse for Named<CompOpt> {
    fn parse(input: ParseStream) -> Result<Self> {
        let name = input.parse::<syn::Ident>()?;
        let name_string = name.to_string();

        let value = match name_string.as_str() {
            "ecsworld_as" => {
                let inner;
                let paren = syn::parenthesized!(inner in input);
                let args = inner.parse()?;
                CompOpt::EcsworldAs(paren, args)
            }
            _ => match Hook::from_name(&name_string) {
                Some(hook) => {
                    let eq: syn::Token![=] = input.parse()?;
                    let path = input.parse::<syn::Path>()?;
                    CompOpt::Hook(hook, eq, path)
                }
                None => {
                    return Err(Error::new_spanned(&name, format!("Unknown argument `{}`", name)))
                }
            },
        };

        Ok(Named { name, value })
    }
}

/// A hook method of the `Component` trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hook {
    Awake,
    Destroy,
    ActiveChanged,
    SceneChanged,
    ProcessEvent,
}

impl Hook {
    const ALL: [Self; 5] =
        [Self::Awake, Self::Destroy, Self::ActiveChanged, Self::SceneChanged, Self::ProcessEvent];

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|hook| hook.name() == name)
    }

    fn name(self) -> &'static str {
        match self {
            Self::Awake => "awake",
            Self::Destroy => "destroy",
            Self::ActiveChanged => "active_changed",
            Self::SceneChanged => "scene_changed",
            Self::ProcessEvent => "process_event",
        }
    }

    /// Generates the trait method that calls `path` with the component and the hook arguments.
    fn forward(self, crate_name: &TokenStream, path: &syn::Path) -> TokenStream {
        let entity = quote!(entity: #crate_name::entity::EntityId);

        match self {
            Self::Awake => quote! {
                fn awake(&mut self, #entity) { #path(self, entity) }
            },
            Self::Destroy => quote! {
                fn destroy(&mut self, #entity) { #path(self, entity) }
            },
            Self::ActiveChanged => quote! {
                fn active_changed(&mut self, #entity, active: bool) { #path(self, entity, active) }
            },
            Self::SceneChanged => quote! {
                fn scene_changed(
                    &mut self,
                    #entity,
                    scene: ::core::option::Option<#crate_name::entity::SceneId>,
                ) {
                    #path(self, entity, scene)
                }
            },
            Self::ProcessEvent => quote! {
                fn process_event(&mut self, #entity, event: &dyn ::core::any::Any) -> bool {
                    #path(self, entity, event)
                }
            },
        }
    }
}
