use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, LitInt, parse_macro_input};

/// Encodes every field in declaration order.
#[proc_macro_derive(Encode)]
pub fn derive_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match struct_fields(&input) {
        Ok(Fields::Named(fields)) => {
            let encodes = fields.named.iter().map(|f| {
                let field = &f.ident;
                quote! { mc_protocol::Encode::encode(&self.#field, writer)?; }
            });
            quote! { #(#encodes)* Ok(()) }
        }
        Ok(Fields::Unnamed(fields)) => {
            let encodes = (0..fields.unnamed.len()).map(|i| {
                let index = syn::Index::from(i);
                quote! { mc_protocol::Encode::encode(&self.#index, writer)?; }
            });
            quote! { #(#encodes)* Ok(()) }
        }
        Ok(Fields::Unit) => quote! { Ok(()) },
        Err(err) => return err.to_compile_error().into(),
    };

    quote! {
        impl #impl_generics mc_protocol::Encode for #name #ty_generics #where_clause {
            fn encode<W: std::io::Write>(&self, writer: &mut W) -> mc_protocol::Result<()> {
                #body
            }
        }
    }
    .into()
}

/// Decodes every field in declaration order.
#[proc_macro_derive(Decode)]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    if input.generics.lifetimes().count() > 0 || input.generics.type_params().count() > 0 {
        return syn::Error::new_spanned(&input.generics, "Decode derive supports plain structs only")
            .to_compile_error()
            .into();
    }

    let body = match struct_fields(&input) {
        Ok(Fields::Named(fields)) => {
            let decodes = fields.named.iter().map(|f| {
                let field = &f.ident;
                let ty = &f.ty;
                quote! { #field: <#ty as mc_protocol::Decode<'_>>::decode(reader)?, }
            });
            quote! { Ok(Self { #(#decodes)* }) }
        }
        Ok(Fields::Unnamed(fields)) => {
            let decodes = fields.unnamed.iter().map(|f| {
                let ty = &f.ty;
                quote! { <#ty as mc_protocol::Decode<'_>>::decode(reader)?, }
            });
            quote! { Ok(Self(#(#decodes)*)) }
        }
        Ok(Fields::Unit) => quote! { Ok(Self) },
        Err(err) => return err.to_compile_error().into(),
    };

    quote! {
        impl mc_protocol::Decode<'_> for #name {
            fn decode<R: std::io::Read>(reader: &mut R) -> mc_protocol::Result<Self> {
                #body
            }
        }
    }
    .into()
}

/// Implements `mc_protocol::Packet` from `#[packet(id = 0x.., state = Play, direction = Clientbound)]`.
///
/// `state` defaults to `Play` and `direction` to `Clientbound`.
#[proc_macro_derive(Packet, attributes(packet))]
pub fn derive_packet(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match packet_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn packet_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut id: Option<LitInt> = None;
    let mut state: Ident = Ident::new("Play", proc_macro2::Span::call_site());
    let mut direction: Ident = Ident::new("Clientbound", proc_macro2::Span::call_site());

    for attr in input.attrs.iter().filter(|a| a.path().is_ident("packet")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                id = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("state") {
                state = meta.value()?.parse()?;
            } else if meta.path.is_ident("direction") {
                direction = meta.value()?.parse()?;
            } else {
                return Err(meta.error("expected `id`, `state` or `direction`"));
            }
            Ok(())
        })?;
    }

    let id = id.ok_or_else(|| {
        syn::Error::new_spanned(name, "missing #[packet(id = ..)] attribute")
    })?;
    let packet_name = name.to_string();

    Ok(quote! {
        impl #impl_generics mc_protocol::Packet for #name #ty_generics #where_clause {
            const ID: i32 = #id;
            const NAME: &'static str = #packet_name;
            const STATE: mc_protocol::State = mc_protocol::State::#state;
            const DIRECTION: mc_protocol::Direction = mc_protocol::Direction::#direction;
        }
    })
}

fn struct_fields(input: &DeriveInput) -> syn::Result<Fields> {
    match &input.data {
        Data::Struct(data) => Ok(data.fields.clone()),
        Data::Enum(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "Encode/Decode derive does not support enums",
        )),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "Encode/Decode derive does not support unions",
        )),
    }
}
