mod discord_properties;
