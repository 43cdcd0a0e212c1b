pub mod bytes_ext;
pub mod descriptor;
pub mod encoding;
pub mod signature;

#[cfg(test)]
mod tests {
    use crate::bytes_ext::{patch_u16, peek_u16, SafeBuf};
    use crate::descriptor::{remap_descriptor, BaseType, FieldType, MethodType, ObjectType};
    use crate::signature::remap_signature;
    use anyhow::Result;

    fn rename(name: &str) -> Option<String> {
        match name {
            "a" => Some("net/minecraft/World".to_string()),
            "b" => Some("net/minecraft/Entity".to_string()),
            "b$c" => Some("net/minecraft/Entity$Removal".to_string()),
            _ => None,
        }
    }

    #[test]
    fn it_parses_simple_descriptors() -> Result<()> {
        let descriptor = FieldType::parse("Z")?;
        let descriptor = descriptor.into_base().unwrap();

        assert!(descriptor.is_boolean());

        Ok(())
    }

    #[test]
    fn it_parses_array_descriptors() -> Result<()> {
        let descriptor = FieldType::parse("[D")?;
        let descriptor = descriptor.into_array().unwrap();

        let field = descriptor.field_type;
        let field = field.into_base().unwrap();

        assert!(field.is_double());

        Ok(())
    }

    #[test]
    fn it_parses_method_descriptors() -> Result<()> {
        let descriptor = MethodType::parse("(IDLjava/lang/Thread;)Ljava/lang/Object;")?;
        assert_eq!(
            descriptor.parameters,
            vec![
                FieldType::Base(BaseType::Int),
                FieldType::Base(BaseType::Double),
                FieldType::Object(ObjectType {
                    class_name: "java/lang/Thread".to_string()
                })
            ]
        );

        assert_eq!(descriptor.to_string(), "(IDLjava/lang/Thread;)Ljava/lang/Object;");

        Ok(())
    }

    #[test]
    fn it_rejects_broken_descriptors() {
        assert!(FieldType::parse("Ljava/lang/Object").is_err());
        assert!(FieldType::parse("IZ").is_err());
        assert!(MethodType::parse("(I").is_err());
        assert!(MethodType::parse("(I)").is_err());
        assert!(FieldType::parse("L;").is_err());
    }

    #[test]
    fn it_remaps_descriptors() -> Result<()> {
        assert_eq!(remap_descriptor("La;", &rename)?, "Lnet/minecraft/World;");
        assert_eq!(
            remap_descriptor("([[La;ILjava/lang/String;)Lb$c;", &rename)?,
            "([[Lnet/minecraft/World;ILjava/lang/String;)Lnet/minecraft/Entity$Removal;"
        );
        assert_eq!(remap_descriptor("(JZ)V", &rename)?, "(JZ)V");

        Ok(())
    }

    #[test]
    fn it_remaps_generic_field_signatures() -> Result<()> {
        assert_eq!(
            remap_signature("Ljava/util/Map<La;Ljava/util/List<+Lb;>;>;", &rename)?,
            "Ljava/util/Map<Lnet/minecraft/World;Ljava/util/List<+Lnet/minecraft/Entity;>;>;"
        );
        assert_eq!(remap_signature("TT;", &rename)?, "TT;");

        Ok(())
    }

    #[test]
    fn it_remaps_class_signatures_with_bounds() -> Result<()> {
        assert_eq!(
            remap_signature(
                "<T:La;U::Ljava/lang/Comparable<TU;>;>Ljava/lang/Object;Ljava/util/function/Supplier<TT;>;",
                &rename
            )?,
            "<T:Lnet/minecraft/World;U::Ljava/lang/Comparable<TU;>;>Ljava/lang/Object;Ljava/util/function/Supplier<TT;>;"
        );

        Ok(())
    }

    #[test]
    fn it_remaps_method_signatures_with_throws() -> Result<()> {
        assert_eq!(
            remap_signature("<E:Ljava/lang/Exception;>(Ljava/util/List<*>;[La;)TE;^TE;^Lb;", &rename)?,
            "<E:Ljava/lang/Exception;>(Ljava/util/List<*>;[Lnet/minecraft/World;)TE;^TE;^Lnet/minecraft/Entity;"
        );

        Ok(())
    }

    #[test]
    fn it_remaps_inner_class_suffixes() -> Result<()> {
        assert_eq!(
            remap_signature("Lb<TT;>.c;", &rename)?,
            "Lnet/minecraft/Entity<TT;>.Removal;"
        );

        Ok(())
    }

    #[test]
    fn it_rejects_truncated_signatures() {
        assert!(remap_signature("Ljava/util/List<La;", &rename).is_err());
        assert!(remap_signature("<T>", &rename).is_err());
    }

    #[test]
    fn it_reads_slices_with_buf_in_scope() -> Result<()> {
        use bytes::Buf;

        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34, 0x07];
        let mut buf = &data[..];

        assert_eq!(buf.safe_get_u32()?, 0xCAFE_BABE);
        assert_eq!(buf.safe_get_u16()?, 52);
        assert_eq!(buf.safe_get_u8()?, 7);
        assert_eq!(buf.remaining(), 0);
        assert!(buf.safe_get_u16().is_err());
        assert!(buf.safe_get_vec(1).is_err());

        Ok(())
    }

    #[test]
    fn it_patches_u16_in_place() -> Result<()> {
        let mut data = vec![0x00, 0x01, 0x00, 0x02];
        patch_u16(&mut data, 2, 0x1234)?;

        assert_eq!(data, [0x00, 0x01, 0x12, 0x34]);
        assert_eq!(peek_u16(&data, 2)?, 0x1234);

        let err = patch_u16(&mut data, 3, 1).unwrap_err();
        assert!(err.to_string().contains("out of bounds (4 bytes)"));
        assert!(peek_u16(&data, 4).is_err());

        Ok(())
    }
}
