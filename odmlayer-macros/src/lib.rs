//! Procedural macros for the odmlayer project.
//!
//! [`client!`] declares a client type with one public delegate field per model key, so
//! delegate access is checked by the compiler instead of looked up by name at runtime.

#[allow(unused_extern_crates)]
extern crate self as odmlayer_macros;

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{
    Attribute, Ident, Token, Visibility, braced,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
};

const MODEL_SUFFIX: &str = "Model";

struct ClientDecl {
    attrs: Vec<Attribute>,
    vis: Visibility,
    name: Ident,
    models: Punctuated<Ident, Token![,]>,
}

impl Parse for ClientDecl {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let vis = input.parse()?;
        input.parse::<Token![struct]>()?;
        let name = input.parse()?;

        let content;
        braced!(content in input);
        let models = content.parse_terminated(Ident::parse, Token![,])?;

        Ok(Self { attrs, vis, name, models })
    }
}

/// Returns the delegate field of a model key (`UserModel` -> `users`).
fn delegate_ident(key: &Ident) -> syn::Result<Ident> {
    let key_str = key.to_string();
    let invalid = || {
        syn::Error::new(
            key.span(),
            format!("model key `{key_str}` does not follow the `<Name>{MODEL_SUFFIX}` convention"),
        )
    };

    let name = key_str.strip_suffix(MODEL_SUFFIX).ok_or_else(invalid)?;
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }

    Ok(Ident::new(&format!("{}s", name.to_lowercase()), key.span()))
}

/// Declares a client with one delegate field per registered model.
///
/// ```ignore
/// odmlayer::client! {
///     /// The blog database.
///     pub struct Blog {
///         UserModel,
///         PostModel,
///     }
/// }
///
/// let blog = Blog::new(ClientConfig::new(InMemoryStore::builder(), registry))?;
/// blog.connect().await?;
/// blog.users.create(doc! { "name": "John", "age": 30 }).await?;
/// ```
///
/// Each key must be `<Name>Model`; its delegate field is `lowercase(Name) + "s"`. `new` fails
/// with a schema error when the registry of the config lacks one of the listed keys.
#[proc_macro]
pub fn client(input: TokenStream) -> TokenStream {
    let decl = parse_macro_input!(input as ClientDecl);

    expand_client(decl)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_client(decl: ClientDecl) -> syn::Result<proc_macro2::TokenStream> {
    let ClientDecl { attrs, vis, name, models } = decl;

    if models.is_empty() {
        return Err(syn::Error::new(name.span(), "a client needs at least one model"));
    }

    let mut fields: Vec<Ident> = Vec::with_capacity(models.len());
    for key in &models {
        let field = delegate_ident(key)?;
        if fields.contains(&field) {
            return Err(syn::Error::new(
                key.span(),
                format!("model key `{key}` maps to the delegate `{field}`, which is already taken"),
            ));
        }
        fields.push(field);
    }

    let keys: Vec<String> = models.iter().map(ToString::to_string).collect();
    let backend = Ident::new("B", Span::call_site());

    Ok(quote! {
        #(#attrs)*
        #vis struct #name<#backend: ::odmlayer::backend::StoreBackend + 'static> {
            client: ::odmlayer::client::Client<#backend>,
            #(pub #fields: ::odmlayer::delegate::Delegate<#backend>,)*
        }

        impl<#backend: ::odmlayer::backend::StoreBackend + 'static> #name<#backend> {
            /// Builds the client; no I/O happens until `connect`.
            pub fn new<C>(
                config: ::odmlayer::config::ClientConfig<C>,
            ) -> ::odmlayer::error::DocumentStoreResult<Self>
            where
                C: ::odmlayer::backend::StoreBackendBuilder<Backend = #backend>
                    + ::std::clone::Clone
                    + ::std::marker::Sync
                    + ::std::fmt::Debug
                    + 'static,
            {
                let client = ::odmlayer::client::Client::new(config);

                ::std::result::Result::Ok(Self {
                    #(#fields: client.delegate_for(#keys)?.clone(),)*
                    client,
                })
            }

            pub async fn connect(&self) -> ::odmlayer::error::DocumentStoreResult<()> {
                self.client.connect().await
            }

            pub async fn close(&self) -> ::odmlayer::error::DocumentStoreResult<()> {
                self.client.close().await
            }

            pub fn models(
                &self,
            ) -> ::std::collections::BTreeMap<&str, &::odmlayer::schema::Model> {
                self.client.models()
            }

            pub fn client(&self) -> &::odmlayer::client::Client<#backend> {
                &self.client
            }
        }

        impl<#backend: ::odmlayer::backend::StoreBackend + 'static> ::std::fmt::Debug for #name<#backend> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(::std::stringify!(#name))
                    .field("client", &self.client)
                    .finish()
            }
        }
    })
}
